//! Wire format types for upstream API protocols
//!
//! Each module contains pure serde structs matching one backend family's
//! JSON format. Response types are lenient: every field the gateway does not
//! strictly need is optional and unknown fields are ignored.

pub mod gemini;
pub mod openai;
pub mod textcomp;
