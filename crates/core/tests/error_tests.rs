// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use finfolio_core::errors::CoreError;
use finfolio_core::validation::FormErrors;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn invalid_file_format() {
        let err = CoreError::InvalidFileFormat("bad header".into());
        assert_eq!(err.to_string(), "Invalid file format: bad header");
    }

    #[test]
    fn unsupported_version() {
        let err = CoreError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version: 99");
    }

    #[test]
    fn decryption() {
        assert_eq!(
            CoreError::Decryption.to_string(),
            "Decryption failed: wrong passphrase or corrupted file"
        );
    }

    #[test]
    fn api() {
        let err = CoreError::Api {
            provider: "Frankfurter".into(),
            message: "HTTP 500".into(),
        };
        assert_eq!(err.to_string(), "API error (Frankfurter): HTTP 500");
    }

    #[test]
    fn no_provider() {
        let err = CoreError::NoProvider("bond".into());
        assert_eq!(err.to_string(), "No provider available for bond quotes");
    }

    #[test]
    fn price_not_available() {
        let err = CoreError::PriceNotAvailable {
            symbol: "USD".into(),
            currency: "KRW".into(),
            date: "2025-01-15".into(),
        };
        assert_eq!(
            err.to_string(),
            "Price not available for USD in KRW on 2025-01-15"
        );
    }

    #[test]
    fn feed() {
        let err = CoreError::Feed {
            url: "https://example.com/rss".into(),
            message: "HTTP 503".into(),
        };
        assert_eq!(err.to_string(), "Feed error (https://example.com/rss): HTTP 503");
    }

    #[test]
    fn not_found() {
        let err = CoreError::not_found("Stock", 42);
        assert_eq!(err.to_string(), "Stock not found: 42");
        assert!(matches!(err, CoreError::NotFound { kind: "Stock", .. }));
    }

    #[test]
    fn form_lists_fields() {
        let mut errors = FormErrors::new();
        errors.add("ticker", "This field is required.");
        let err = CoreError::Form(errors);
        assert_eq!(err.to_string(), "Invalid input: ticker: This field is required.");
    }

    #[test]
    fn permission_and_auth() {
        assert_eq!(
            CoreError::PermissionDenied("nope".into()).to_string(),
            "Permission denied: nope"
        );
        assert_eq!(
            CoreError::Authentication("bad credentials".into()).to_string(),
            "Authentication failed: bad credentials"
        );
        assert_eq!(
            CoreError::Conflict("taken".into()).to_string(),
            "Conflict: taken"
        );
    }
}

// ── From conversions ────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::FileIO(msg) if msg.contains("no such file")));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_form_errors() {
        let mut errors = FormErrors::new();
        errors.add("title", "This field is required.");
        let err: CoreError = errors.into();
        match err {
            CoreError::Form(fields) => assert!(fields.has("title")),
            other => panic!("expected form error, got {other:?}"),
        }
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }

    #[test]
    fn question_mark_propagates_form_errors() {
        fn check() -> Result<(), CoreError> {
            let mut errors = FormErrors::new();
            errors.add("name", "bad");
            errors.into_result()?;
            Ok(())
        }
        assert!(matches!(check(), Err(CoreError::Form(_))));
    }
}
