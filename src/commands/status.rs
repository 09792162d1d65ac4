use warden::platform::{Platform, ReleaseLayout};
use warden::{VersionStore, WardenConfig};

pub(crate) async fn cmd_status(config: &WardenConfig) -> anyhow::Result<()> {
    let store = VersionStore::new(config.version_file_path());

    let Some(info) = store.load().await? else {
        println!("No version installed ({} not found)", store.path().display());
        return Ok(());
    };

    let layout = ReleaseLayout::new(&config.work_dir, &config.product, Platform::current());
    let bundle = layout.bundle(&info.version);
    let missing = bundle.missing_entries();

    println!("version: {}", info.version);
    println!("url:     {}", info.url);
    println!("sha1:    {}", info.sha1);
    println!("bundle:  {}", bundle.dir().display());
    if missing.is_empty() {
        println!("state:   complete");
    } else {
        println!("state:   incomplete (missing {})", missing.join(", "));
    }
    Ok(())
}
