//! Chat limit boundaries across version families.

use rstest::rstest;
use shimframe::{
    ProtocolVersion,
    policy::{LONG_MESSAGE_LENGTH, ServerExtension, StaticCapabilities, active_limits, chat_length},
};

fn caps(longer_messages: bool, username_length: usize) -> StaticCapabilities {
    StaticCapabilities {
        extensions: if longer_messages {
            vec![ServerExtension::LongerMessages]
        } else {
            Vec::new()
        },
        username_length,
    }
}

#[rstest]
#[case(ProtocolVersion::BEDROCK_LATEST, 512)]
#[case(ProtocolVersion::R1_8, 100)]
#[case(ProtocolVersion::R1_9_3, 100)]
#[case(ProtocolVersion::R1_10, 256)]
#[case(ProtocolVersion::R1_20_5, 256)]
fn release_and_bedrock_limits(#[case] version: ProtocolVersion, #[case] expected: i32) {
    assert_eq!(chat_length(version, &caps(false, 8)), expected);
}

#[test]
fn classic_extension_lifts_the_limit() {
    let limits = active_limits(ProtocolVersion::C0_28_TO_C0_30, &caps(true, 8));
    assert!(limits.max_message_length >= LONG_MESSAGE_LENGTH);
    assert!(limits.legacy_extension_active);
    assert!(!limits.is_bedrock_family);
}

#[rstest]
#[case(0, 62)]
#[case(16, 46)]
#[case(62, 0)]
#[case(70, -8)]
fn classic_limit_shrinks_with_username(#[case] username: usize, #[case] expected: i32) {
    assert_eq!(
        chat_length(ProtocolVersion::C0_28_TO_C0_30, &caps(false, username)),
        expected
    );
}

#[test]
fn extension_is_ignored_outside_classic() {
    let limits = active_limits(ProtocolVersion::R1_8, &caps(true, 8));
    assert_eq!(limits.max_message_length, 100);
    assert!(!limits.legacy_extension_active);
}

#[test]
fn bedrock_is_flagged_as_bedrock_family() {
    assert!(active_limits(ProtocolVersion::BEDROCK_LATEST, &caps(false, 0)).is_bedrock_family);
}
