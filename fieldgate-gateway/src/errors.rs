#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Unable to read certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Broker did not acknowledge the connection within {0}s")]
    ConnectTimeout(u64),

    #[error("Not connected to the broker")]
    NotConnected,

    #[error("Payload codec error: {0}")]
    Codec(#[from] fieldgate_api::protocols::Error),

    #[error("Outbound queue closed")]
    QueueClosed,
}
