//! CLI argument definitions for `chime`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("chime")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mix and play audio files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("INPUT")
                .value_name("FILE")
                .required(true)
                .help("Audio file to play"),
        )
        .arg(
            Arg::new("volume")
                .long("volume")
                .short('v')
                .value_name("PERCENT")
                .default_value("100")
                .help("Playback volume as a percentage"),
        )
        .arg(
            Arg::new("loop")
                .long("loop")
                .short('l')
                .action(ArgAction::SetTrue)
                .help("Loop the track until interrupted or the duration runs out"),
        )
        .arg(
            Arg::new("stream")
                .long("stream")
                .action(ArgAction::SetTrue)
                .help("Stream from a spool file instead of preloading into memory"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .short('d')
                .value_name("SECONDS")
                .help("Stop playback after this many seconds"),
        )
        .arg(
            Arg::new("update-rate")
                .long("update-rate")
                .value_name("HZ")
                .default_value("25")
                .help("Mixer extraction cycles per second"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Mix to memory instead of an audio device and report what was produced"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_required() {
        assert!(build_cli().try_get_matches_from(["chime"]).is_err());
    }

    #[test]
    fn flags_parse() {
        let matches = build_cli()
            .try_get_matches_from(["chime", "song.wav", "--loop", "--dry-run", "-d", "3"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("INPUT").unwrap(), "song.wav");
        assert!(matches.get_flag("loop"));
        assert!(matches.get_flag("dry-run"));
        assert_eq!(matches.get_one::<String>("duration").unwrap(), "3");
    }
}
