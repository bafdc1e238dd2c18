pub(crate) mod connection;
pub(crate) mod data_channel;
