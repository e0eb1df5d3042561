//! Loading settings from disk and applying them to a connection.

mod common;

use std::{fs, path::PathBuf, process};

use common::{compressed_frame_at, configured_pipeline, frame};
use rstest::{fixture, rstest};
use shimframe::{
    PipelineEvent,
    ProtocolVersion,
    Settings,
    settings::SettingsError,
    sync::{DEFAULT_CUSTOM_PAYLOAD_ID, SyncMessage},
};
use shimframe_testing::{SyncHarness, custom_payload, sync_harness};

struct TempFile(PathBuf);

impl TempFile {
    fn with_contents(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("shimframe-{}-{name}.toml", process::id()));
        fs::write(&path, contents).expect("write settings file");
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) { let _ = fs::remove_file(&self.0); }
}

#[fixture]
fn custom_file() -> TempFile {
    TempFile::with_contents(
        "custom",
        "replace_default_port = false\ncompression_level = 9\n",
    )
}

#[rstest]
fn load_reads_overrides_and_keeps_defaults(custom_file: TempFile) {
    let settings = Settings::load(&custom_file.0).expect("load");
    assert_eq!(
        settings,
        Settings {
            replace_default_port: false,
            compression_level: 9,
            ..Settings::default()
        }
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = TempFile::with_contents("malformed", "replace_default_port = \"yes\"");
    assert!(matches!(Settings::load(&file.0), Err(SettingsError::Parse(_))));
}

#[test]
fn unreadable_path_is_a_read_error() {
    let missing = std::env::temp_dir().join("shimframe-does-not-exist.toml");
    assert!(matches!(
        Settings::load(missing),
        Err(SettingsError::Read { .. })
    ));
}

#[rstest]
fn custom_payload_id_selects_the_intercepted_packet(mut sync_harness: SyncHarness) {
    let settings = Settings {
        custom_payload_id: 0x18,
        ..Settings::default()
    };
    let mut pipeline =
        configured_pipeline(&sync_harness.registry, ProtocolVersion::R1_12_2, &settings);
    let token = sync_harness.registry.schedule(|_| {});
    let body = SyncMessage::encode(sync_harness.registry.channel(), &token, b"");

    let on_default_id = custom_payload(DEFAULT_CUSTOM_PAYLOAD_ID, &body);
    let delivered = pipeline.fire_read(frame(&on_default_id)).expect("read");
    assert_eq!(delivered, vec![on_default_id]);
    assert!(sync_harness.registry.contains(&token));

    let delivered = pipeline
        .fire_read(frame(&custom_payload(0x18, &body)))
        .expect("read");
    assert!(delivered.is_empty());
    assert_eq!(sync_harness.main.run_pending(), 1);
}

#[rstest]
fn compression_level_applies_to_outbound_packets(sync_harness: SyncHarness) {
    const THRESHOLD: usize = 16;
    let settings = Settings {
        compression_level: 0,
        ..Settings::default()
    };
    let mut pipeline =
        configured_pipeline(&sync_harness.registry, ProtocolVersion::R1_12_2, &settings);
    pipeline.enable_compression(THRESHOLD).expect("compression");
    pipeline
        .user_event(&PipelineEvent::CompressionReorder)
        .expect("reorder");
    let packet = custom_payload(0x03, &[b'a'; 256]);

    let sent = pipeline.fire_write(packet.clone()).expect("write");

    let stored = compressed_frame_at(&packet, THRESHOLD, 0);
    assert_eq!(sent, vec![stored.clone()]);
    assert_ne!(stored, compressed_frame_at(&packet, THRESHOLD, 6));
}
