use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const DEFAULT_MIME: &str = "image/png";

/// Chart screenshot as received from the client, reduced to its base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime: String,
    data: String,
}

impl ImagePayload {
    /// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
    ///
    /// Everything up to and including the first comma is dropped; the rest is
    /// kept byte for byte. Returns `None` when only whitespace remains.
    pub fn parse(input: &str) -> Option<Self> {
        let (header, data) = match input.split_once(',') {
            Some((header, data)) => (Some(header), data),
            None => (None, input),
        };

        if data.trim().is_empty() {
            return None;
        }

        let mime = header
            .and_then(mime_from_header)
            .or_else(|| sniff_mime(data.trim()))
            .unwrap_or(DEFAULT_MIME)
            .to_string();

        Some(Self {
            mime,
            data: data.to_string(),
        })
    }

    /// The base64 payload with any data-URL prefix removed.
    pub fn payload(&self) -> &str {
        &self.data
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

fn mime_from_header(header: &str) -> Option<&'static str> {
    let header = header.trim().to_ascii_lowercase();
    let media = header.strip_prefix("data:")?;
    let media = media.split(';').next().unwrap_or_default();

    match media {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/gif" => Some("image/gif"),
        "image/webp" => Some("image/webp"),
        _ => None,
    }
}

/// Looks at the magic bytes of the first decoded block.
fn sniff_mime(data: &str) -> Option<&'static str> {
    let raw = data.as_bytes();
    let mut usable = raw.len().min(16);
    usable -= usable % 4;
    let bytes = STANDARD.decode(&raw[..usable]).ok()?;

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
        Some("image/webp")
    } else {
        None
    }
}
