use jarinject_format::{
    inject, resolve::Resolve, Coordinate, FileResolver, InjectOptions, LocalRepository,
};

use crate::cli::InjectArgs;
use crate::error::{Error, Result};

fn resolver(args: &InjectArgs) -> Result<Box<dyn Resolve>> {
    if let Some(path) = &args.loader {
        return Ok(Box::new(FileResolver(path.clone())));
    }

    let root = match &args.repository {
        Some(root) => root.clone(),
        None => LocalRepository::default_root().ok_or(Error::NoRepository)?,
    };
    tracing::debug!(root = %root.display(), "resolving loader from local repository");
    Ok(Box::new(LocalRepository::new(root)))
}

pub fn run(args: InjectArgs) -> Result<()> {
    let loader = match &args.loader_coordinate {
        Some(s) => s.parse::<Coordinate>().map_err(Error::Coordinate)?,
        None => Coordinate::loader(&args.runtime_version),
    };

    let options = InjectOptions {
        target: args.target.clone(),
        loader,
        main_class: args.main_class.clone(),
        loader_main_class: args.loader_main_class.clone(),
    };

    let resolver = resolver(&args)?;
    let report = inject(&options, resolver.as_ref())
        .map_err(|source| Error::inject(args.target.clone(), source))?;

    tracing::info!(
        target = %report.target.display(),
        loader = %report.loader.display(),
        entries = report.stats.total(),
        real_main_class = %report.real_main_class,
        "injected runtime loader"
    );
    if report.already_redirected {
        tracing::info!("archive already launched the loader; entry point kept");
    }

    Ok(())
}
