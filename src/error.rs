use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("cache operation failed")]
    Cache,
    #[display("key {_0:?} is not cached")]
    NotCached(#[error(not(source))] String),
    #[display("could not render output")]
    Output,
}
