use bitflags::bitflags;

bitflags! {
    /// Emitter options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JsonFlags: u32 {
        /// Strict JSON: quote every key and escape single quotes.
        const DISABLE_JSON5 = 1 << 0;
        /// Reserved for per-object metadata. Accepted and ignored.
        const OBJECT_NAME_PROPERTY = 1 << 1;
        /// Quote every key even in JSON5 mode.
        const FORCE_QUOTE_KEYS = 1 << 2;
    }
}

impl JsonFlags {
    #[must_use]
    pub fn json5(self) -> bool {
        !self.contains(JsonFlags::DISABLE_JSON5)
    }

    #[must_use]
    pub fn quote_keys(self) -> bool {
        self.intersects(JsonFlags::DISABLE_JSON5 | JsonFlags::FORCE_QUOTE_KEYS)
    }
}

impl Default for JsonFlags {
    /// JSON5 with bare identifier keys.
    fn default() -> Self {
        JsonFlags::empty()
    }
}
