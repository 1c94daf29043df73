use anyhow::Result;
use clap::Args;
use gatekeep::server::authn::jwt::JwtTokenGenerator;
use gatekeep::types::identity::{IdentityContext, Role, Verification};

use super::ConfigArgs;

/// Issue a bearer token signed with the configured secret, for operators and
/// manual testing.
#[derive(Args)]
pub struct TokenArgs {
    /// User id (the `sub` claim).
    pub user: String,

    /// Role: customer, artisan, distributor or admin.
    #[arg(short, long, default_value = "customer")]
    pub role: String,

    #[arg(long)]
    pub identity_verified: bool,

    #[arg(long)]
    pub email_verified: bool,

    #[arg(long)]
    pub phone_verified: bool,

    #[arg(long)]
    pub has_address: bool,

    /// Token lifetime in seconds.
    #[arg(short, long, default_value = "3600")]
    pub expiry: u64,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl TokenArgs {
    pub fn run(self) -> Result<()> {
        let cfg = self.config.load_server()?;

        let identity = IdentityContext {
            user_id: self.user,
            role: Role::parse(&self.role),
            verification: Verification {
                identity: self.identity_verified,
                email: self.email_verified,
                phone: self.phone_verified,
            },
            has_address: self.has_address,
        };
        let generator = JwtTokenGenerator::new(&cfg.authn.secret, self.expiry);
        println!("{}", generator.generate_token(&identity)?);
        Ok(())
    }
}
