//! Wire format conversion
//!
//! This module decodes streamed server responses into typed values.

pub mod stream_decoder;
