use anyhow::Result;
use bump_version::{
    arguments::Arguments,
    workflow::{self, VersionMeta},
};
use clap::Parser;
use log::LevelFilter;

fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .init();

    let dry = args.dry;
    let options = args.into_options();

    if dry {
        let meta = workflow::dry_run(&options)?;
        print_summary("Dry run complete, no files were modified.", &meta, "Files that would be updated");
    } else {
        let meta = workflow::run(&options)?;
        print_summary("Version bump successful!", &meta, "Updated files");
    }
    Ok(())
}

fn print_summary(headline: &str, meta: &VersionMeta, files_heading: &str) {
    println!("{headline}");
    println!("  Old Version: {}", meta.old_version);
    println!("  New Version: {}", meta.new_version);
    println!("  Bump Type:   {}", meta.bump_type);
    if !meta.updated_files.is_empty() {
        println!("{files_heading}:");
        for file in &meta.updated_files {
            println!("  - {}", file.display());
        }
    }
}
