use bytes::{Buf, BytesMut};
use encoding_rs::{DecoderResult, Encoding};
use std::io;
use tokio_util::codec::Decoder;

/// Frames raw bytes in a declared charset into UTF-8 chunks.
///
/// Malformed input is an error rather than a replacement character, so a
/// binary file picked by mistake fails the preview instead of rendering noise.
pub struct CharsetDecoder {
    encoding: &'static Encoding,
    decoder: encoding_rs::Decoder,
    finished: bool,
}

impl CharsetDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder(),
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> io::Result<Option<BytesMut>> {
        if self.finished {
            return Ok(None);
        }
        if src.is_empty() && !last {
            return Ok(None);
        }

        let capacity = self
            .decoder
            .max_utf8_buffer_length_without_replacement(src.len())
            .unwrap_or_else(|| src.len() * 3 + 16);
        let mut out = vec![0u8; capacity];

        let (result, read, written) =
            self.decoder
                .decode_to_utf8_without_replacement(&src[..], &mut out, last);

        if let DecoderResult::Malformed(_, _) = result {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("input is not valid {}", self.encoding.name()),
            ));
        }

        src.advance(read);
        if last {
            self.finished = true;
        }

        if written == 0 {
            return Ok(None);
        }
        out.truncate(written);
        Ok(Some(BytesMut::from(&out[..])))
    }
}

impl Decoder for CharsetDecoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.transcode(src, false)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.transcode(buf, true)
    }
}
