//! Helper macros for the app

/// Boilerplate for `Error` types wrapping a `failure::Context<ErrorKind>`.
/// Expects `Error { inner: Context<ErrorKind> }` and a `Fail` ErrorKind in
/// scope at the call site.
macro_rules! derive_error_impls {
    () => {
        #[allow(dead_code)]
        impl Error {
            pub fn kind(&self) -> ErrorKind {
                self.inner.get_context().clone()
            }
        }

        impl Fail for Error {
            fn cause(&self) -> Option<&Fail> {
                self.inner.cause()
            }

            fn backtrace(&self) -> Option<&Backtrace> {
                self.inner.backtrace()
            }
        }

        impl fmt::Display for Error {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.inner, f)
            }
        }

        impl From<ErrorKind> for Error {
            fn from(kind: ErrorKind) -> Error {
                Error {
                    inner: Context::new(kind),
                }
            }
        }

        impl From<Context<ErrorKind>> for Error {
            fn from(inner: Context<ErrorKind>) -> Error {
                Error { inner }
            }
        }
    };
}

/// Implements diesel `FromSql` / `ToSql` for a newtype wrapping a single
/// SQL-mappable value, so typed ids can be used directly in queries.
macro_rules! derive_newtype_sql {
    ($mod_name:ident, $sql_type:ty, $type:ty, $constructor:expr) => {
        mod $mod_name {
            use std::io::Write;

            use diesel::deserialize::{self, FromSql};
            use diesel::pg::Pg;
            use diesel::serialize::{self, Output, ToSql};

            use super::*;

            impl FromSql<$sql_type, Pg> for $type {
                fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
                    FromSql::<$sql_type, Pg>::from_sql(data).map($constructor)
                }
            }

            impl ToSql<$sql_type, Pg> for $type {
                fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                    ToSql::<$sql_type, Pg>::to_sql(&self.0, out)
                }
            }
        }
    };
}
