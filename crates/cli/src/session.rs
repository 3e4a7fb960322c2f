use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use config::Config;
use json::tuple_to_json;
use schema::SchemaDict;
use tracing::{debug, info};
use tuple::{Datetime, FieldType, Tag, TupleBuilder, TupleView, Value};

/// What the shell should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Exit,
}

/// Counters printed by `STATS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub fields: usize,
    pub bytes: usize,
    pub junk: usize,
    pub max_fields: usize,
    pub max_bytes: usize,
    pub schema_fields: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fields={}/{} bytes={}/{} junk={} schema_fields={}",
            self.fields, self.max_fields, self.bytes, self.max_bytes, self.junk, self.schema_fields
        )
    }
}

/// One tuple under construction plus the schema used to render it.
#[derive(Debug)]
pub struct Session {
    tuple: TupleBuilder,
    schema: SchemaDict,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let tuple = TupleBuilder::new(config.max_fields, config.max_bytes)
            .context("creating tuple builder")?;
        Ok(Self {
            tuple,
            schema: SchemaDict::new(),
            config,
        })
    }

    /// Runs one command line. Failures are reported as `ERR ...` replies.
    pub fn execute(&mut self, line: &str) -> Outcome {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Outcome::Reply(String::new());
        };
        let args: Vec<&str> = parts.collect();
        let cmd = cmd.to_uppercase();
        let result = match cmd.as_str() {
            "INSERT" | "UPSERT" => match args.as_slice() {
                [col, ty, value @ ..] if !value.is_empty() => {
                    let value = value.join(" ");
                    parse_column(col).and_then(|col| {
                        if cmd == "INSERT" {
                            self.insert(col, ty, &value)
                        } else {
                            self.upsert(col, ty, &value)
                        }
                    })
                    .map(|()| "OK".to_string())
                }
                _ => Err(anyhow!("usage: {cmd} col type value")),
            },
            "ERASE" => match args.as_slice() {
                [col, ty] => parse_column(col)
                    .and_then(|col| self.erase(col, ty))
                    .map(|n| format!("OK ({n} erased)")),
                _ => Err(anyhow!("usage: ERASE col type")),
            },
            "NAME" => match args.as_slice() {
                [col, ty, name] => parse_column(col)
                    .and_then(|col| self.name(col, ty, name))
                    .map(|()| "OK".to_string()),
                _ => Err(anyhow!("usage: NAME col type name")),
            },
            "ENUM" => match args.as_slice() {
                [col, value, label] => parse_column(col)
                    .and_then(|col| {
                        let value = value
                            .parse()
                            .with_context(|| format!("bad enum value '{value}'"))?;
                        let label = if *label == "-" { "" } else { *label };
                        self.enum_label(col, value, label)
                    })
                    .map(|()| "OK".to_string()),
                _ => Err(anyhow!("usage: ENUM col value label")),
            },
            "CLEAR" => {
                self.clear();
                Ok("OK".to_string())
            }
            "JSON" => self.json(),
            "SCHEMA" => self.schema_json(),
            "CHECK" => self.check().map(|()| "OK".to_string()),
            "HEX" => self.hex(),
            "SAVE" => match args.as_slice() {
                [path] => self.save(Path::new(path)).map(|n| format!("OK ({n} bytes)")),
                _ => Err(anyhow!("usage: SAVE path")),
            },
            "LOAD" => match args.as_slice() {
                [path] => self.load(Path::new(path)).map(|n| format!("OK ({n} fields)")),
                _ => Err(anyhow!("usage: LOAD path")),
            },
            "STATS" => Ok(self.stats().to_string()),
            "EXIT" | "QUIT" => return Outcome::Exit,
            other => Err(anyhow!("unknown command: {other}")),
        };
        match result {
            Ok(reply) => Outcome::Reply(reply),
            Err(e) => {
                debug!(command = %cmd, error = %e, "command failed");
                Outcome::Reply(format!("ERR {e:#}"))
            }
        }
    }

    pub fn insert(&mut self, column: u16, ty: &str, raw: &str) -> Result<()> {
        self.store(column, ty, raw, false)
    }

    pub fn upsert(&mut self, column: u16, ty: &str, raw: &str) -> Result<()> {
        self.store(column, ty, raw, true)
    }

    pub fn erase(&mut self, column: u16, ty: &str) -> Result<usize> {
        let ty = parse_type(ty)?;
        Ok(self.tuple.erase(Tag::new(column, ty))?)
    }

    pub fn name(&mut self, column: u16, ty: &str, name: &str) -> Result<()> {
        let ty = parse_type(ty)?;
        self.schema.add_field(name, ty, column)?;
        Ok(())
    }

    pub fn enum_label(&mut self, column: u16, value: u16, label: &str) -> Result<()> {
        self.schema.add_enum_value(column, label, value)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tuple.clear();
    }

    pub fn json(&mut self) -> Result<String> {
        let indent = self.config.indent.as_deref();
        let flags = self.config.flags();
        let view = self.tuple.freeze(false)?;
        Ok(tuple_to_json(&view, indent, 0, &self.schema, flags)?)
    }

    pub fn schema_json(&self) -> Result<String> {
        Ok(self.schema.schema_to_json(self.config.indent.as_deref())?)
    }

    pub fn check(&mut self) -> Result<()> {
        let view = self.tuple.freeze(false)?;
        view.check()?;
        Ok(())
    }

    pub fn hex(&mut self) -> Result<String> {
        let view = self.tuple.freeze(false)?;
        Ok(to_hex(view.as_bytes()))
    }

    /// Writes the shrunk tuple to `path`.
    pub fn save(&mut self, path: &Path) -> Result<usize> {
        let view = self.tuple.freeze(true)?;
        std::fs::write(path, view.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = view.as_bytes().len(), "tuple saved");
        Ok(view.as_bytes().len())
    }

    /// Replaces the tuple with the one stored at `path`.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let view = TupleView::new(&bytes)?;
        self.tuple = TupleBuilder::fetch(&view, self.config.max_fields, self.config.max_bytes)?;
        info!(path = %path.display(), fields = view.len(), "tuple loaded");
        Ok(view.len())
    }

    pub fn stats(&self) -> Stats {
        Stats {
            fields: self.tuple.len(),
            bytes: self.tuple.bytes_used(),
            junk: self.tuple.junk_bytes(),
            max_fields: self.tuple.max_fields(),
            max_bytes: self.tuple.max_bytes(),
            schema_fields: self.schema.len(),
        }
    }

    fn store(&mut self, column: u16, ty: &str, raw: &str, upsert: bool) -> Result<()> {
        let ty = parse_type(ty)?;
        match ty.element_type() {
            Some(elem) => {
                let raws: Vec<&str> = raw.split(',').map(str::trim).collect();
                let decoded = raws
                    .iter()
                    .map(|r| decode_if_binary(elem, r))
                    .collect::<Result<Vec<_>>>()?;
                let items = raws
                    .iter()
                    .zip(&decoded)
                    .map(|(r, bin)| self.literal(column, elem, r, bin))
                    .collect::<Result<Vec<_>>>()?;
                if upsert {
                    self.tuple.upsert_array(column, elem, &items)?;
                } else {
                    self.tuple.insert_array(column, elem, &items)?;
                }
            }
            None => {
                let bin = decode_if_binary(ty, raw)?;
                let value = self.literal(column, ty, raw, &bin)?;
                let tag = Tag::new(column, ty);
                if upsert {
                    self.tuple.upsert(tag, value)?;
                } else {
                    self.tuple.insert(tag, value)?;
                }
            }
        }
        Ok(())
    }

    /// Parses `raw` as a scalar of type `ty`. Binary types take their bytes
    /// from `bin`, the hex-decoded form of `raw`.
    fn literal<'a>(&self, column: u16, ty: FieldType, raw: &'a str, bin: &'a [u8]) -> Result<Value<'a>> {
        let bad = || format!("bad {ty} value '{raw}'");
        let value = match ty {
            FieldType::Null => Value::Null,
            FieldType::Uint16 => Value::Uint16(self.uint16(column, raw)?),
            FieldType::Int32 => Value::Int32(raw.parse().with_context(bad)?),
            FieldType::Uint32 => Value::Uint32(raw.parse().with_context(bad)?),
            FieldType::Fp32 => Value::Fp32(raw.parse().with_context(bad)?),
            FieldType::Int64 => Value::Int64(raw.parse().with_context(bad)?),
            FieldType::Uint64 => Value::Uint64(raw.parse().with_context(bad)?),
            FieldType::Fp64 => Value::Fp64(raw.parse().with_context(bad)?),
            FieldType::Datetime => Value::Datetime(parse_datetime(raw)?),
            FieldType::B96 => Value::B96(bin.try_into().with_context(bad)?),
            FieldType::B128 => Value::B128(bin.try_into().with_context(bad)?),
            FieldType::B160 => Value::B160(bin.try_into().with_context(bad)?),
            FieldType::B256 => Value::B256(bin.try_into().with_context(bad)?),
            FieldType::Cstr => Value::Cstr(raw.as_bytes()),
            FieldType::Opaque => Value::Opaque(bin),
            other => bail!("{other} fields cannot be written from the shell"),
        };
        Ok(value)
    }

    /// A number, `true`/`false`, or an enum label registered for `column`.
    fn uint16(&self, column: u16, raw: &str) -> Result<u16> {
        if let Ok(v) = raw.parse() {
            return Ok(v);
        }
        match raw {
            "true" => Ok(1),
            "false" => Ok(0),
            label => self
                .schema
                .label_to_value(column, label)
                .ok_or_else(|| anyhow!("no enum label '{label}' in column {column}")),
        }
    }
}

/// Type names as printed by the emitter, plus `bool`, `enum`, `enum[]` and
/// `str`.
pub fn parse_type(name: &str) -> Result<FieldType> {
    let name = name.to_lowercase();
    let ty = match name.as_str() {
        "bool" | "enum" => Some(FieldType::ENUM),
        "enum[]" => Some(FieldType::ARRAY_ENUM),
        "str" => Some(FieldType::Cstr),
        other => FieldType::from_name(other),
    };
    ty.ok_or_else(|| anyhow!("unknown field type '{name}'"))
}

fn parse_column(raw: &str) -> Result<u16> {
    raw.parse().with_context(|| format!("bad column '{raw}'"))
}

/// RFC 3339 text, `now`, or raw 32.32 fixed-point seconds.
fn parse_datetime(raw: &str) -> Result<Datetime> {
    if raw.eq_ignore_ascii_case("now") {
        return Datetime::from_utc(&Utc::now()).context("current time out of range");
    }
    if let Ok(fixed) = raw.parse::<u64>() {
        return Ok(Datetime::from_fixedpoint(fixed));
    }
    let time = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad datetime value '{raw}'"))?
        .with_timezone(&Utc);
    Datetime::from_utc(&time).with_context(|| format!("datetime '{raw}' out of range"))
}

fn decode_if_binary(ty: FieldType, raw: &str) -> Result<Vec<u8>> {
    match ty {
        FieldType::B96 | FieldType::B128 | FieldType::B160 | FieldType::B256 | FieldType::Opaque => {
            decode_hex(raw)
        }
        _ => Ok(Vec::new()),
    }
}

pub fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    if raw.len() % 2 != 0 {
        bail!("odd number of hex digits in '{raw}'");
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| {
            raw.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("bad hex '{raw}'"))
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
