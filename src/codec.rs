use bytes::{Buf, BytesMut};
use log::warn;
use std::io;
use tokio_util::codec::Decoder;

/// Re-encodes a byte stream in some legacy charset into UTF-8 so the CSV
/// parser only ever sees UTF-8 text.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    charset: &'static encoding_rs::Encoding,
    warned: bool,
}

impl Utf8Transcoder {
    pub fn new(charset: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: charset.new_decoder(),
            charset,
            warned: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> Option<BytesMut> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 4);
        let mut out = vec![0u8; capacity];
        let (_result, read, written, lossy) = self.decoder.decode_to_utf8(src, &mut out, last);

        if lossy && !self.warned {
            self.warned = true;
            warn!(
                "input is not valid {}; malformed sequences replaced with U+FFFD",
                self.charset.name()
            );
        }

        src.advance(read);
        if written == 0 {
            return None;
        }
        out.truncate(written);
        Some(BytesMut::from(&out[..]))
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // A trailing partial sequence stays in the decoder's own state, so an
        // empty output here just means "need more input".
        Ok(self.transcode(src, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let out = self.transcode(buf, true);
        buf.clear();
        Ok(out)
    }
}
