use super::AttachmentFile;
use rand::{distributions::Alphanumeric, rngs::SmallRng, Rng, SeedableRng};
use std::sync::OnceLock;

/// Length of the generated boundary string.
const BOUNDARY_LEN: usize = 16;

/// The process-wide multipart boundary.
///
/// Generated once; every form in the process shares it.
fn boundary() -> &'static str {
    static BOUNDARY: OnceLock<String> = OnceLock::new();

    BOUNDARY.get_or_init(|| {
        let rng = SmallRng::from_entropy();

        rng.sample_iter(&Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect()
    })
}

/// A `multipart/form-data` body carrying one `payload_json` part plus any
/// number of `files[N]` parts.
#[derive(Clone, Debug)]
pub struct Form {
    buffer: Vec<u8>,
    file_index: u64,
}

impl Form {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            file_index: 0,
        }
    }

    /// The value of the `Content-Type` header for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", boundary())
    }

    /// Append the `payload_json` part.
    pub fn payload_json(&mut self, json: &[u8]) -> &mut Self {
        self.start_part();
        self.buffer.extend_from_slice(
            b"Content-Disposition: form-data; name=\"payload_json\"\r\n\
              Content-Type: application/json\r\n\r\n",
        );
        self.buffer.extend_from_slice(json);

        self
    }

    /// Append one `files[N]` part.
    ///
    /// Falls back to `application/octet-stream` when the caller did not
    /// specify a content type.
    pub fn file(&mut self, file: &AttachmentFile) -> &mut Self {
        let index = self.file_index;
        self.file_index += 1;

        self.start_part();
        self.buffer
            .extend_from_slice(format!("Content-Disposition: form-data; name=\"files[{index}]\"; filename=\"").as_bytes());
        self.escaped_filename(&file.filename);
        self.buffer.extend_from_slice(b"\"\r\nContent-Type: ");
        self.buffer.extend_from_slice(
            file.content_type
                .as_deref()
                .unwrap_or("application/octet-stream")
                .as_bytes(),
        );
        self.buffer.extend_from_slice(b"\r\n\r\n");
        self.buffer.extend_from_slice(&file.data);

        self
    }

    /// Finish the form, returning the full body.
    pub fn build(mut self) -> Vec<u8> {
        self.buffer.extend_from_slice(b"\r\n--");
        self.buffer.extend_from_slice(boundary().as_bytes());
        self.buffer.extend_from_slice(b"--\r\n");

        self.buffer
    }

    fn start_part(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.extend_from_slice(b"\r\n");
        }

        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(boundary().as_bytes());
        self.buffer.extend_from_slice(b"\r\n");
    }

    /// Write the filename with quotes and backslashes escaped, so a hostile
    /// name can not break out of the quoted disposition parameter.
    fn escaped_filename(&mut self, filename: &str) {
        for byte in filename.bytes() {
            if byte == b'"' || byte == b'\\' {
                self.buffer.push(b'\\');
            }

            self.buffer.push(byte);
        }
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{boundary, Form};
    use crate::request::AttachmentFile;

    #[test]
    fn boundary_is_stable_within_the_process() {
        assert_eq!(boundary(), boundary());
        assert_eq!(16, boundary().len());
    }

    #[test]
    fn form_layout() {
        let mut form = Form::new();
        form.payload_json(br#"{"content":"hi"}"#);
        form.file(&AttachmentFile::new("a.png", vec![1, 2, 3]).content_type("image/png"));
        form.file(&AttachmentFile::new("b.bin", vec![4]));

        let body = String::from_utf8_lossy(&form.clone().build()).into_owned();

        assert!(body.contains("name=\"payload_json\""));
        assert!(body.contains("name=\"files[0]\"; filename=\"a.png\""));
        assert!(body.contains("Content-Type: image/png"));
        assert!(body.contains("name=\"files[1]\"; filename=\"b.bin\""));
        assert!(body.contains("Content-Type: application/octet-stream"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary())));
    }

    #[test]
    fn filename_quotes_are_escaped() {
        let mut form = Form::new();
        form.file(&AttachmentFile::new("a\"b.txt", vec![0]));

        let body = String::from_utf8_lossy(&form.build()).into_owned();

        assert!(body.contains("filename=\"a\\\"b.txt\""));
    }
}
