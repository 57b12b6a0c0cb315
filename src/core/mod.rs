// Core pieces of the fetch pipeline: errors, body reading, and JSON decoding.
pub mod body;
pub mod decode;
pub mod error;
