use snafu::Snafu;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MessagingError {
    #[snafu(display("message field '{field}' is invalid on `{stage}`: {reason}"))]
    InvalidMessage {
        stage: &'static str,
        field: &'static str,
        reason: String,
    },
    #[snafu(display("subscriber #{subscriber} failed on `{stage}`: {details}"))]
    SubscriberFailure {
        stage: &'static str,
        subscriber: u64,
        details: String,
    },
}

pub type MessagingResult<T> = Result<T, MessagingError>;
