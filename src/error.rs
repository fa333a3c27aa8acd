use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Raised only under `CyclePolicy::Reject`; `path` starts and ends on the same step.
    #[error("dependency cycle among steps: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("unknown stage `{0}`")]
    UnknownStage(String),
    #[error("no transition for {event} while in {state}")]
    InvalidTransition { state: String, event: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Client-side rejection of a document; no request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("Please select a PDF file")]
    NotPdf,
    #[error("File size must be less than {}", format_size(*limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("Empty file uploaded")]
    Empty,
}

/// Whole mebibytes as `50MB`, otherwise MB or KB with up to two decimals, bytes below 1 KiB.
fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    let scaled = |unit: u64, suffix: &str| {
        let value = format!("{:.2}", bytes as f64 / unit as f64);
        let value = value.trim_end_matches('0').trim_end_matches('.');
        format!("{value}{suffix}")
    };
    if bytes >= MIB {
        scaled(MIB, "MB")
    } else if bytes >= KIB {
        scaled(KIB, "KB")
    } else {
        format!("{bytes} bytes")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadFailure {
    /// No usable response: unreachable host, non-2xx status or an unparseable body.
    #[error("Network error: Unable to connect to server")]
    Transport { reason: String },
    /// The service answered but could not produce a workflow.
    #[error("{message}")]
    Application { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] InputRejection),
    #[error(transparent)]
    Failed(#[from] UploadFailure),
    #[error("an upload is already in progress")]
    Busy,
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn too_large(limit: u64) -> String {
        InputRejection::TooLarge {
            size: limit + 1,
            limit,
        }
        .to_string()
    }

    #[test]
    fn size_limit_message_keeps_sub_megabyte_limits_readable() {
        assert_eq!(too_large(50 * 1024 * 1024), "File size must be less than 50MB");
        assert_eq!(too_large(1536 * 1024), "File size must be less than 1.5MB");
        assert_eq!(too_large(512 * 1024), "File size must be less than 512KB");
        assert_eq!(too_large(1536), "File size must be less than 1.5KB");
        assert_eq!(too_large(100), "File size must be less than 100 bytes");
    }
}
