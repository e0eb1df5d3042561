//! Handler names used to locate positions in the host pipeline.

/// Name of the inbound version-translation handler.
pub const VIA_DECODER_NAME: &str = "via-decoder";

/// Name of the outbound version-translation handler.
pub const VIA_ENCODER_NAME: &str = "via-encoder";

/// Host handlers the adaptation pipeline positions itself against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    /// Inbound frame splitter.
    LengthSplitter,
    /// Outbound length prefixer.
    LengthPrepender,
    /// Inbound decompression.
    Decompress,
    /// Outbound compression.
    Compress,
    /// Inbound packet decoder.
    PacketDecoder,
    /// Outbound packet encoder.
    PacketEncoder,
}

impl HandlerRole {
    /// Roles that must be present before translation handlers are spliced in.
    pub const REQUIRED: [Self; 4] = [
        Self::LengthSplitter,
        Self::PacketDecoder,
        Self::LengthPrepender,
        Self::PacketEncoder,
    ];
}

/// Mapping from handler roles to the names the host registers them under.
pub trait HandlerNames: Send + Sync {
    /// Host name for `role`.
    fn name(&self, role: HandlerRole) -> &str;
}

/// Names used by the stock host client.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostHandlerNames;

impl HandlerNames for HostHandlerNames {
    fn name(&self, role: HandlerRole) -> &str {
        match role {
            HandlerRole::LengthSplitter => "splitter",
            HandlerRole::LengthPrepender => "prepender",
            HandlerRole::Decompress => "decompress",
            HandlerRole::Compress => "compress",
            HandlerRole::PacketDecoder => "inbound_config",
            HandlerRole::PacketEncoder => "encoder",
        }
    }
}
