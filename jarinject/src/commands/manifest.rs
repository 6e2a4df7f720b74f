use crate::cli::ManifestArgs;
use crate::error::{Error, Result};

pub fn run(args: ManifestArgs) -> Result<()> {
    let mut reader = super::open_archive(&args.archive)?;
    let manifest = reader
        .manifest()
        .map_err(|source| Error::ReadManifest {
            path: args.archive.clone(),
            source,
        })?
        .ok_or_else(|| Error::NoManifest {
            path: args.archive.clone(),
        })?;

    for (key, value) in manifest.main_attributes().iter() {
        println!("{}: {}", key, value);
    }

    for section in manifest.sections() {
        println!();
        println!("[{}]", section.name);
        for (key, value) in section.attributes.iter() {
            println!("  {}: {}", key, value);
        }
    }

    Ok(())
}
