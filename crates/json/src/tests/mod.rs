mod emitter_tests;
mod helpers;
