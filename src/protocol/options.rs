//! Session options sent with `SESSION CREATE` / `SESSION ADD`.
//!
//! I2CP option names follow <https://geti2p.net/en/docs/protocol/i2cp>,
//! SAM option names follow <https://geti2p.net/en/docs/api/samv3>.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::SamError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamOptions {
    pub from_port: Option<u16>,
    pub to_port: Option<u16>,
    pub i2cp_options: Option<I2cpOptions>,
    /// Only sent for `TRANSIENT` destinations; a persistent key already
    /// carries its signature type.
    pub signature_type: SignatureType,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cpOptions {
    pub router_options: Option<I2cpRouterOptions>,
    pub client_options: Option<I2cpClientOptions>,
}

/// Options interpreted by the router.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cpRouterOptions {
    pub client_message_timeout: Option<u32>,
    pub crypto_options: Option<RouterCryptoOptions>,
    /// Generally true for clients, false for servers.
    pub dont_publish_lease_set: Option<bool>,
    pub fast_receive: Option<bool>,
    pub lease_set_auth_type: Option<LeaseSetAuthType>,
    pub lease_set_enc_type: Option<LeaseSetEncType>,
    /// Seconds since the epoch.
    pub lease_set_offline_expiration: Option<u32>,
    pub lease_set_offline_signature: Option<String>,
    pub lease_set_priv_key: Option<String>,
    pub lease_set_secret: Option<String>,
    pub lease_set_transient_public_key: Option<String>,
    pub lease_set_type: Option<LeaseSetType>,
    pub message_reliability: Option<MessageReliability>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub inbound: Option<TunnelInboundOptions>,
    pub outbound: Option<TunnelOutboundOptions>,
    /// Must stay true when the lease set is not published, otherwise the
    /// far end cannot reply.
    pub should_bundle_reply_info: Option<bool>,
}

/// Options interpreted by the client side of I2CP.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cpClientOptions {
    /// Milliseconds.
    pub close_idle_time: Option<u64>,
    pub close_on_idle: Option<bool>,
    pub encrypt_lease_set: Option<bool>,
    pub fast_receive: Option<bool>,
    pub gzip: Option<bool>,
    pub lease_set_auth_type: Option<LeaseSetAuthType>,
    pub lease_set_blinded_type: Option<u16>,
    pub lease_set_enc_type: Option<LeaseSetEncType>,
    pub lease_set_key: Option<String>,
    pub lease_set_private_key: Option<String>,
    pub lease_set_secret: Option<String>,
    pub lease_set_signing_private_key: Option<String>,
    pub message_reliability: Option<MessageReliability>,
    /// Milliseconds, minimum 5 minutes.
    pub reduce_idle_time: Option<u64>,
    pub reduce_on_idle: Option<bool>,
    pub reduce_quantity: Option<u8>,
    pub ssl: Option<bool>,
    pub tcp_host: Option<String>,
    pub tcp_port: Option<u16>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterCryptoOptions {
    pub low_tag_threshold: Option<u8>,
    pub ratchet_inbound_tags: Option<u64>,
    pub ratchet_outbound_tags: Option<u64>,
    pub tags_to_send: Option<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelInboundOptions {
    pub allow_zero_hop: Option<bool>,
    pub backup_quantity: Option<u8>,
    pub ip_restriction: Option<u8>,
    /// The router clamps the total length to 0..=7.
    pub length: Option<u8>,
    pub length_variance: Option<i8>,
    pub quantity: Option<u8>,
    pub random_key: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelOutboundOptions {
    pub allow_zero_hop: Option<bool>,
    pub backup_quantity: Option<u8>,
    pub ip_restriction: Option<u8>,
    pub length: Option<u8>,
    pub length_variance: Option<i8>,
    pub priority: Option<i8>,
    pub quantity: Option<u8>,
    pub random_key: Option<String>,
}

/// Comma separated list of encryption type numbers, e.g. `4,0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseSetEncType(String);

impl Default for LeaseSetEncType {
    fn default() -> Self {
        LeaseSetEncType::from("4,0")
    }
}

impl From<&str> for LeaseSetEncType {
    fn from(val: &str) -> Self {
        LeaseSetEncType(val.to_string())
    }
}

impl From<String> for LeaseSetEncType {
    fn from(val: String) -> Self {
        LeaseSetEncType(val)
    }
}

impl fmt::Display for LeaseSetEncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseSetType(pub u8);

impl Default for LeaseSetType {
    fn default() -> Self {
        LeaseSetType(1)
    }
}

impl fmt::Display for LeaseSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaseSetAuthType {
    #[default]
    NoPerClient,
    DhPerClient,
    PskPerClient,
}

impl fmt::Display for LeaseSetAuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            LeaseSetAuthType::NoPerClient => 0,
            LeaseSetAuthType::DhPerClient => 1,
            LeaseSetAuthType::PskPerClient => 2,
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageReliability {
    BestEffort,
    #[default]
    None,
}

impl fmt::Display for MessageReliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageReliability::BestEffort => f.write_str("BestEffort"),
            MessageReliability::None => f.write_str("None"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    #[serde(rename = "DSA_SHA1")]
    DsaSha1,
    #[serde(rename = "ECDSA_SHA256_P256")]
    EcdsaSha256P256,
    #[serde(rename = "ECDSA_SHA384_P384")]
    EcdsaSha384P384,
    #[serde(rename = "ECDSA_SHA512_P521")]
    EcdsaSha512P521,
    #[serde(rename = "RSA_SHA256_2048")]
    RsaSha256_2048,
    #[serde(rename = "RSA_SHA384_3072")]
    RsaSha384_3072,
    #[serde(rename = "RSA_SHA512_4096")]
    RsaSha512_4096,
    #[default]
    #[serde(rename = "EdDSA_SHA512_Ed25519")]
    EdDsaSha512Ed25519,
    #[serde(rename = "EdDSA_SHA512_Ed25519ph")]
    EdDsaSha512Ed25519ph,
    #[serde(rename = "RedDSA_SHA512_Ed25519")]
    RedDsaSha512Ed25519,
}

impl SignatureType {
    pub const ALL: [SignatureType; 10] = [
        SignatureType::DsaSha1,
        SignatureType::EcdsaSha256P256,
        SignatureType::EcdsaSha384P384,
        SignatureType::EcdsaSha512P521,
        SignatureType::RsaSha256_2048,
        SignatureType::RsaSha384_3072,
        SignatureType::RsaSha512_4096,
        SignatureType::EdDsaSha512Ed25519,
        SignatureType::EdDsaSha512Ed25519ph,
        SignatureType::RedDsaSha512Ed25519,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::DsaSha1 => "DSA_SHA1",
            SignatureType::EcdsaSha256P256 => "ECDSA_SHA256_P256",
            SignatureType::EcdsaSha384P384 => "ECDSA_SHA384_P384",
            SignatureType::EcdsaSha512P521 => "ECDSA_SHA512_P521",
            SignatureType::RsaSha256_2048 => "RSA_SHA256_2048",
            SignatureType::RsaSha384_3072 => "RSA_SHA384_3072",
            SignatureType::RsaSha512_4096 => "RSA_SHA512_4096",
            SignatureType::EdDsaSha512Ed25519 => "EdDSA_SHA512_Ed25519",
            SignatureType::EdDsaSha512Ed25519ph => "EdDSA_SHA512_Ed25519ph",
            SignatureType::RedDsaSha512Ed25519 => "RedDSA_SHA512_Ed25519",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = SamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignatureType::ALL
            .iter()
            .find(|sig| sig.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| SamError::InvalidConfigValueError {
                field: "signature_type".to_string(),
                value: s.to_string(),
                reason: "Unknown signature type".to_string(),
            })
    }
}

/// Collects `key=value` pairs, keeping the first value for a repeated key.
#[derive(Default)]
struct OptionWriter {
    pairs: Vec<(String, String)>,
}

impl OptionWriter {
    fn push<T: fmt::Display>(&mut self, key: &str, value: &Option<T>) {
        if let Some(value) = value {
            if !self.pairs.iter().any(|(k, _)| k == key) {
                self.pairs.push((key.to_string(), value.to_string()));
            }
        }
    }

    fn finish(self) -> String {
        self.pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Defaults set only the signature type and the lease set encryption types.
/// Leaving the encryption types to the router made destinations unreachable
/// on some router versions.
impl Default for SamOptions {
    fn default() -> Self {
        SamOptions {
            from_port: None,
            to_port: None,
            i2cp_options: Some(I2cpOptions {
                router_options: Some(I2cpRouterOptions {
                    lease_set_enc_type: Some(LeaseSetEncType::default()),
                    ..Default::default()
                }),
                client_options: Some(I2cpClientOptions {
                    lease_set_enc_type: Some(LeaseSetEncType::default()),
                    ..Default::default()
                }),
            }),
            signature_type: SignatureType::default(),
        }
    }
}

impl SamOptions {
    /// Options without any I2CP tuning, everything left to the router.
    pub fn bare() -> Self {
        SamOptions {
            i2cp_options: None,
            ..Default::default()
        }
    }

    /// Sets the default lease set encryption types wherever none is given,
    /// keeping every other option as it is.
    pub fn with_default_enc_types(mut self) -> Self {
        let i2cp = self.i2cp_options.get_or_insert_with(I2cpOptions::default);
        let router = i2cp.router_options.get_or_insert_with(Default::default);
        router
            .lease_set_enc_type
            .get_or_insert_with(LeaseSetEncType::default);
        let client = i2cp.client_options.get_or_insert_with(Default::default);
        client
            .lease_set_enc_type
            .get_or_insert_with(LeaseSetEncType::default);
        self
    }

    /// The space separated option list as it goes on the wire.
    pub fn options(&self) -> String {
        let mut w = OptionWriter::default();
        w.push("FROM_PORT", &self.from_port);
        w.push("TO_PORT", &self.to_port);
        if let Some(i2cp) = &self.i2cp_options {
            if let Some(router) = &i2cp.router_options {
                router.write(&mut w);
            }
            if let Some(client) = &i2cp.client_options {
                client.write(&mut w);
            }
        }
        w.finish()
    }

    pub fn inbound(&self) -> Option<&TunnelInboundOptions> {
        self.i2cp_options
            .as_ref()?
            .router_options
            .as_ref()?
            .inbound
            .as_ref()
    }

    pub fn outbound(&self) -> Option<&TunnelOutboundOptions> {
        self.i2cp_options
            .as_ref()?
            .router_options
            .as_ref()?
            .outbound
            .as_ref()
    }
}

impl fmt::Display for SamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.options())
    }
}

impl I2cpRouterOptions {
    fn write(&self, w: &mut OptionWriter) {
        w.push("clientMessageTimeout", &self.client_message_timeout);
        if let Some(crypto) = &self.crypto_options {
            crypto.write(w);
        }
        w.push("i2cp.dontPublishLeaseSet", &self.dont_publish_lease_set);
        w.push("i2cp.fastReceive", &self.fast_receive);
        w.push("i2cp.leaseSetAuthType", &self.lease_set_auth_type);
        w.push("i2cp.leaseSetEncType", &self.lease_set_enc_type);
        w.push(
            "i2cp.leaseSetOfflineExpiration",
            &self.lease_set_offline_expiration,
        );
        w.push(
            "i2cp.leaseSetOfflineSignature",
            &self.lease_set_offline_signature,
        );
        w.push("i2cp.leaseSetPrivKey", &self.lease_set_priv_key);
        w.push("i2cp.leaseSetSecret", &self.lease_set_secret);
        w.push(
            "i2cp.leaseSetTransientPublicKey",
            &self.lease_set_transient_public_key,
        );
        w.push("i2cp.leaseSetType", &self.lease_set_type);
        w.push("i2cp.messageReliability", &self.message_reliability);
        w.push("i2cp.password", &self.password);
        w.push("i2cp.username", &self.username);
        if let Some(inbound) = &self.inbound {
            inbound.write(w);
        }
        if let Some(outbound) = &self.outbound {
            outbound.write(w);
        }
        w.push("shouldBundleReplyInfo", &self.should_bundle_reply_info);
    }
}

impl I2cpClientOptions {
    fn write(&self, w: &mut OptionWriter) {
        w.push("i2cp.closeIdleTime", &self.close_idle_time);
        w.push("i2cp.closeOnIdle", &self.close_on_idle);
        w.push("i2cp.encryptLeaseSet", &self.encrypt_lease_set);
        w.push("i2cp.fastReceive", &self.fast_receive);
        w.push("i2cp.gzip", &self.gzip);
        w.push("i2cp.leaseSetAuthType", &self.lease_set_auth_type);
        w.push("i2cp.leaseSetBlindedType", &self.lease_set_blinded_type);
        w.push("i2cp.leaseSetEncType", &self.lease_set_enc_type);
        w.push("i2cp.leaseSetKey", &self.lease_set_key);
        w.push("i2cp.leaseSetPrivateKey", &self.lease_set_private_key);
        w.push("i2cp.leaseSetSecret", &self.lease_set_secret);
        w.push(
            "i2cp.leaseSetSigningPrivateKey",
            &self.lease_set_signing_private_key,
        );
        w.push("i2cp.messageReliability", &self.message_reliability);
        w.push("i2cp.reduceIdleTime", &self.reduce_idle_time);
        w.push("i2cp.reduceOnIdle", &self.reduce_on_idle);
        w.push("i2cp.reduceQuantity", &self.reduce_quantity);
        w.push("i2cp.SSL", &self.ssl);
        w.push("i2cp.tcp.host", &self.tcp_host);
        w.push("i2cp.tcp.port", &self.tcp_port);
    }
}

impl RouterCryptoOptions {
    fn write(&self, w: &mut OptionWriter) {
        w.push("crypto.lowTagThreshold", &self.low_tag_threshold);
        w.push("crypto.ratchet.inboundTags", &self.ratchet_inbound_tags);
        w.push("crypto.ratchet.outboundTags", &self.ratchet_outbound_tags);
        w.push("crypto.tagsToSend", &self.tags_to_send);
    }
}

impl TunnelInboundOptions {
    fn write(&self, w: &mut OptionWriter) {
        w.push("inbound.allowZeroHop", &self.allow_zero_hop);
        w.push("inbound.backupQuantity", &self.backup_quantity);
        w.push("inbound.IPRestriction", &self.ip_restriction);
        w.push("inbound.length", &self.length);
        w.push("inbound.lengthVariance", &self.length_variance);
        w.push("inbound.quantity", &self.quantity);
        w.push("inbound.randomKey", &self.random_key);
    }
}

impl TunnelOutboundOptions {
    fn write(&self, w: &mut OptionWriter) {
        w.push("outbound.allowZeroHop", &self.allow_zero_hop);
        w.push("outbound.backupQuantity", &self.backup_quantity);
        w.push("outbound.IPRestriction", &self.ip_restriction);
        w.push("outbound.length", &self.length);
        w.push("outbound.lengthVariance", &self.length_variance);
        w.push("outbound.priority", &self.priority);
        w.push("outbound.quantity", &self.quantity);
        w.push("outbound.randomKey", &self.random_key);
    }
}
