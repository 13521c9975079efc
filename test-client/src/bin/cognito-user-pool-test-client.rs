// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::Parser;
use cognito_user_pool::UserPoolConfig;
use cognito_user_pool_test_client::Tester;
use slog::Drain;

#[derive(Debug, Parser)]
#[clap(about = "Cognito user pool test client")]
struct Args {
    #[clap(long, env = "COGNITO_USER_POOL_ID")]
    user_pool_id: String,

    #[clap(long, env = "AWS_REGION")]
    region: String,

    /// Use these credentials instead of the default provider chain
    #[clap(long, env = "AWS_ACCESS_KEY_ID", requires = "secret_access_key")]
    access_key_id: Option<String>,

    #[clap(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt: Args = Args::try_parse()?;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = slog::Logger::root(drain, slog::o!());

    let mut config = UserPoolConfig::new(opt.region);
    if let (Some(access_key_id), Some(secret_access_key)) =
        (opt.access_key_id, opt.secret_access_key)
    {
        config = config.with_credentials(access_key_id, secret_access_key);
    }

    let tester = Tester::new(log, opt.user_pool_id, &config).await?;
    tester.run().await?;

    println!("SUCCESS");

    Ok(())
}
