use clap::Parser;
use vrt_lib::Mode;

#[derive(Parser)]
#[command(name = "vrt")]
#[command(
    version,
    about = "Visual regression testing - screenshot capture regions of a served page and diff them against golden images",
    long_about = "Visual regression testing (VRT)\n\nServes the compiled page, screenshots every capture region and compares it with the golden image in the screenshots directory. Mismatches are written to an HTML report.\n\nConfiguration is read from the file named by VRT_CONFIG, else ./vrt.toml, else built-in defaults. Log verbosity follows RUST_LOG."
)]
pub struct Cli {
    #[arg(
        long,
        help = "Overwrite golden images with fresh screenshots and delete outdated ones"
    )]
    pub update: bool,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        Mode::from_update_flag(self.update)
    }
}

/// Parses the process arguments. On failure the clap error is returned for
/// the caller to print.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
