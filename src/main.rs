use clap::Parser;
use falcon_embed::commands::{Command, EmbedCommand};
use falcon_embed::context::AppContext;

#[derive(Parser)]
#[command(name = "falcon-embed")]
#[command(
    author,
    version,
    about = "Modify an existing Docker image to copy files and directories from a Falcon image",
    long_about = None
)]
struct Cli {
    /// The tag of the existing image to modify
    source_image_tag: String,

    /// The tag of the falcon image to copy files and directories from
    falcon_image_tag: String,

    /// The tag of the modified image to create
    target_image_tag: String,

    /// The Falcon CID value to embed in final image
    cid: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let command = EmbedCommand {
        source_image: cli.source_image_tag,
        falcon_image: cli.falcon_image_tag,
        target_image: cli.target_image_tag,
        cid: cli.cid,
    };

    let result = match AppContext::builder().build() {
        Ok(ctx) => command.execute(&ctx).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        println!("{e:#}");
        std::process::exit(1);
    }
}
