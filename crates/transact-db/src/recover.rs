use std::any::Any;
use std::error::Error as StdError;

const PANIC_PREFIX: &str = "recovered from panic";

/// Converts a panic payload into an error.
///
/// Payloads that already are an `anyhow::Error` or a boxed error are returned
/// unchanged; string payloads are wrapped with a prefix. `Any` cannot be
/// downcast to `dyn Error`, so a bare concrete error type is opaque here.
pub(crate) fn into_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
        Ok(err) => return anyhow::anyhow!(*err),
        Err(payload) => payload,
    };
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return anyhow::anyhow!("{PANIC_PREFIX}: {msg}");
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return anyhow::anyhow!("{PANIC_PREFIX}: {msg}");
    }
    anyhow::anyhow!("{PANIC_PREFIX}: non-string payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(f: impl FnOnce() + std::panic::UnwindSafe) -> Box<dyn Any + Send> {
        std::panic::catch_unwind(f).unwrap_err()
    }

    #[test]
    fn test_str_payload_is_prefixed() {
        let err = into_error(payload_of(|| panic!("lemon")));
        assert_eq!(err.to_string(), "recovered from panic: lemon");
    }

    #[test]
    fn test_formatted_payload_is_prefixed() {
        let fruit = "lemon";
        let err = into_error(payload_of(|| panic!("sour {fruit}")));
        assert_eq!(err.to_string(), "recovered from panic: sour lemon");
    }

    #[test]
    fn test_anyhow_payload_is_reused() {
        let err = into_error(payload_of(|| {
            std::panic::panic_any(anyhow::anyhow!("banana").context("peeling"));
        }));
        assert_eq!(format!("{err:#}"), "peeling: banana");
    }

    #[test]
    fn test_boxed_error_payload_is_reused() {
        let err = into_error(payload_of(|| {
            let boxed: Box<dyn StdError + Send + Sync> =
                Box::new(std::io::Error::other("disk on fire"));
            std::panic::panic_any(boxed);
        }));
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_bare_concrete_error_payload_is_opaque() {
        let err = into_error(payload_of(|| {
            std::panic::panic_any(std::io::Error::other("disk on fire"));
        }));
        assert_eq!(err.to_string(), "recovered from panic: non-string payload");
    }

    #[test]
    fn test_opaque_payload_is_described() {
        let err = into_error(payload_of(|| std::panic::panic_any(7_u32)));
        assert_eq!(err.to_string(), "recovered from panic: non-string payload");
    }
}
