// Streaming adapters.
//
//   - `driver`: staging buffers and the phase machine every adapter runs on
//   - `writer`: `XzWriter`, compressing `Write` adapter
//   - `reader`: `XzReader`, decompressing `Read` adapter
//   - `buffer`: one-shot `encode` / `decode` over slices

mod buffer;
mod driver;
mod reader;
mod writer;

pub use buffer::{decode, decode_with_engine, encode, encode_with_engine};
pub use reader::XzReader;
pub use writer::XzWriter;
