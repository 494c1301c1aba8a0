//! Command-line surface: `ton-pool-starter [--ngrok]`.

pub const TUNNEL_FLAG: &str = "--ngrok";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    /// Also open an ngrok tunnel to the frontend.
    pub tunnel: bool,
}

impl CliArgs {
    /// Parse arguments after the program name. Unknown arguments are ignored.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();
        for arg in args {
            match arg.as_ref() {
                TUNNEL_FLAG => parsed.tunnel = true,
                other => tracing::debug!("ignoring unknown argument '{}'", other),
            }
        }
        parsed
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }
}
