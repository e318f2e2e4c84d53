//! Property-based and filesystem tests for the validation module.

use proptest::prelude::*;
use std::io::Write;

use crate::validation::{
    FileKind, MAX_IMAGE_SIZE, VideoParams, check_file_exists, check_file_size, get_mime_type,
    validate_blend_weights, validate_image_file, validate_prompt, validate_video_file,
    validate_video_id, validate_video_params,
};

fn width_params(width: i64) -> VideoParams {
    VideoParams {
        width: Some(width),
        ..Default::default()
    }
}

fn height_params(height: i64) -> VideoParams {
    VideoParams {
        height: Some(height),
        ..Default::default()
    }
}

proptest! {
    /// A duration is reported iff it falls outside [5, 20].
    #[test]
    fn duration_error_iff_out_of_range(seconds in -100.0f64..100.0f64) {
        let params = VideoParams { n_seconds: Some(seconds), ..Default::default() };
        let result = validate_video_params(&params);
        let out_of_range = !(5.0..=20.0).contains(&seconds);

        prop_assert_eq!(!result.valid, out_of_range);
        prop_assert_eq!(result.errors.len(), usize::from(out_of_range));
    }

    /// A width is reported iff it is outside [256, 1920] or not a multiple of 8.
    #[test]
    fn width_error_iff_out_of_range_or_misaligned(width in -4096i64..4096i64) {
        let result = validate_video_params(&width_params(width));
        let bad = !(256..=1920).contains(&width) || width % 8 != 0;
        prop_assert_eq!(!result.valid, bad);
    }

    /// Same structure for height with bounds [256, 1080].
    #[test]
    fn height_error_iff_out_of_range_or_misaligned(height in -4096i64..4096i64) {
        let result = validate_video_params(&height_params(height));
        let bad = !(256..=1080).contains(&height) || height % 8 != 0;
        prop_assert_eq!(!result.valid, bad);
    }

    /// Prompts are valid iff they have 3..=1000 characters, and invalid
    /// prompts never carry warnings.
    #[test]
    fn prompt_validity_depends_only_on_length(prompt in "[a-z <>{}]{0,1100}") {
        let result = validate_prompt(&prompt);
        let length = prompt.chars().count();

        prop_assert_eq!(result.valid, (3..=1000).contains(&length));
        if !result.valid {
            prop_assert!(result.warnings.is_none());
            prop_assert!(result.error.is_some());
        } else {
            prop_assert!(result.error.is_none());
        }
    }

    /// Well-formed identifiers of the right length are accepted.
    #[test]
    fn well_formed_video_ids_are_accepted(id in "[A-Za-z0-9_-]{3,100}") {
        prop_assert!(validate_video_id(&id));
    }

    /// Any identifier containing a character outside the allowed set is rejected.
    #[test]
    fn ids_with_foreign_characters_are_rejected(
        prefix in "[A-Za-z0-9]{2,10}",
        bad in "[ !@#$%^&*()+=/.:;]",
    ) {
        let id = format!("{}{}", prefix, bad);
        prop_assert!(!validate_video_id(&id));
    }

    /// Splitting 1.0 into two weights always validates.
    #[test]
    fn complementary_weights_are_valid(first in 0.0f64..=1.0f64) {
        let result = validate_blend_weights(&[first, 1.0 - first], 2);
        prop_assert!(result.valid, "{:?}", result);
    }

    /// A count mismatch is reported before anything else.
    #[test]
    fn count_mismatch_wins(weights in prop::collection::vec(-2.0f64..2.0f64, 0..6), expected in 0usize..6) {
        prop_assume!(weights.len() != expected);
        let result = validate_blend_weights(&weights, expected);
        prop_assert!(!result.valid);
        prop_assert!(result.error.unwrap().starts_with("Number of weights"));
    }

    /// Calling a validator twice gives the same answer.
    #[test]
    fn validators_are_idempotent(
        prompt in ".{0,600}",
        id in ".{0,20}",
        path in "[a-zA-Z0-9_]{1,10}\\.[a-zA-Z0-9]{1,5}",
    ) {
        prop_assert_eq!(validate_prompt(&prompt), validate_prompt(&prompt));
        prop_assert_eq!(validate_video_id(&id), validate_video_id(&id));
        prop_assert_eq!(get_mime_type(&path), get_mime_type(&path));
    }

    /// MIME lookup ignores extension case.
    #[test]
    fn mime_lookup_is_case_insensitive(stem in "[a-z]{1,8}", ext in prop::sample::select(vec!["png", "jpg", "mp4", "webm", "tiff"])) {
        let lower = format!("{}.{}", stem, ext);
        let upper = format!("{}.{}", stem, ext.to_uppercase());
        prop_assert_eq!(get_mime_type(&lower), get_mime_type(&upper));
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_file_is_reported_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.xyz");

        assert!(!check_file_exists(&path).await);

        let result = validate_image_file(&path).await;
        assert!(!result.valid);
        assert_eq!(result.error, Some(format!("File not found: {}", path.display())));
        assert!(result.metadata.is_none());
    }

    #[tokio::test]
    async fn check_file_size_reports_size() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "clip.mp4", 2048);

        let check = check_file_size(&path, 4096).await;
        assert!(check.valid);
        assert_eq!(check.size, 2048);

        let check = check_file_size(&path, 1024).await;
        assert!(!check.valid);
        assert_eq!(check.size, 2048);
    }

    #[tokio::test]
    async fn check_file_size_stat_failure() {
        let dir = TempDir::new().unwrap();
        let check = check_file_size(dir.path().join("nope.mp4"), 4096).await;
        assert!(!check.valid);
        assert_eq!(check.size, 0);
    }

    #[tokio::test]
    async fn valid_image_has_metadata() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "Reference.PNG", 1234);

        let result = validate_image_file(&path).await;
        assert!(result.valid, "{:?}", result);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.extension, ".png");
        assert_eq!(metadata.size, 1234);
    }

    #[tokio::test]
    async fn unsupported_image_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "clip.mp4", 10);

        let result = validate_image_file(&path).await;
        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("Unsupported image format: .mp4. Supported formats: .jpg, .jpeg, .png, .webp, .gif, .bmp, .tiff")
        );
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.jpg");
        let file = std::fs::File::create(&path).unwrap();
        // Sparse file: sets the length without writing 20 MiB.
        file.set_len(MAX_IMAGE_SIZE + 1024 * 1024).unwrap();

        let result = validate_image_file(&path).await;
        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("Image file too large: 21.00MB. Maximum size: 20MB")
        );
    }

    #[tokio::test]
    async fn image_at_exact_limit_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("limit.webp");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_IMAGE_SIZE).unwrap();

        assert!(validate_image_file(&path).await.valid);
    }

    #[tokio::test]
    async fn video_file_validation() {
        let dir = TempDir::new().unwrap();
        let video = write_file(&dir, "take1.MKV", 64);
        let image = write_file(&dir, "still.png", 64);

        let result = validate_video_file(&video).await;
        assert!(result.valid);
        assert_eq!(result.metadata.unwrap().extension, ".mkv");

        let result = validate_video_file(&image).await;
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("Unsupported video format: .png."));
    }

    #[tokio::test]
    async fn file_validation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "frame.gif", 99);

        let first = validate_image_file(&path).await;
        let second = validate_image_file(&path).await;
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fifo_is_checked_without_opening() {
        use nix::sys::stat::Mode;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipe.png");
        nix::unistd::mkfifo(path.as_path(), Mode::S_IRUSR | Mode::S_IWUSR).unwrap();

        let exists = tokio::time::timeout(Duration::from_secs(3), check_file_exists(&path))
            .await
            .expect("existence check must not block on a FIFO");
        assert!(exists);

        let result = tokio::time::timeout(Duration::from_secs(3), validate_image_file(&path))
            .await
            .expect("image validation must not block on a FIFO");
        assert!(result.valid, "{:?}", result);
        assert_eq!(result.metadata.unwrap().size, 0);
    }

    #[tokio::test]
    async fn directory_is_not_a_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(check_file_exists(dir.path()).await);
        assert!(!check_file_exists(dir.path().join("absent")).await);
    }

    #[test]
    fn file_kind_limits() {
        assert_eq!(FileKind::Image.max_size(), 20 * 1024 * 1024);
        assert_eq!(FileKind::Video.max_size(), 500 * 1024 * 1024);
        assert!(FileKind::Image.supported_formats().contains(&".tiff"));
        assert!(FileKind::Video.supported_formats().contains(&".m4v"));
    }
}
