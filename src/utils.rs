use rand::Rng;

/// Short random hex id used to correlate an offer/answer exchange.
pub(crate) fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}
