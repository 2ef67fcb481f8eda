#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use rj_codec as codec;
pub use rj_json as json;
pub use rj_spec as spec;
pub use rj_types as types;
pub use rj_utils as utils;
