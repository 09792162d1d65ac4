use warden::{VersionInfo, WardenConfig};

pub(crate) async fn cmd_check(config: &WardenConfig) -> anyhow::Result<()> {
    let installer = super::build_installer(config)?;
    let installed = installer.check_and_install(&VersionInfo::default()).await;

    if installed.is_empty() {
        anyhow::bail!("no version installed, see log for details");
    }

    let bundle = installer.layout().bundle(&installed.version);
    println!("version: {}", installed.version);
    println!("bundle:  {}", bundle.dir().display());
    Ok(())
}
