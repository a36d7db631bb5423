pub mod transport_codec;
pub mod transport_format;

pub use transport_codec::{
    decode, decode_bytes, encode, encode_bytes, payload_bytes, DecodeError, EncodeError,
};
pub use transport_format::TransportFormat;
