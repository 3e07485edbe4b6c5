use crate::audio::GenderDirection;

/// A recognized chat command, already stripped of prefix and aliases
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Join,
    Leave,
    PitchUp,
    PitchDown,
    Gender(GenderDirection),
    Custom(f32),
    Off,
    Status,

    /// A known command with a missing or unparseable argument; carries the
    /// usage line to send back
    Usage(&'static str),
}

impl Command {
    /// Parses a message body. Returns None for anything that is not a
    /// command for us, including unknown commands after the prefix.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let body = content.trim().strip_prefix(prefix)?;
        let mut words = body.split_whitespace();

        let command = match words.next()? {
            "join" | "j" => Self::Join,
            "leave" | "l" => Self::Leave,
            "pitch_up" | "up" => Self::PitchUp,
            "pitch_down" | "down" => Self::PitchDown,
            "gender" | "g" => Self::Gender(parse_direction(words.next())),
            "custom" | "c" => match words.next().map(str::parse) {
                Some(Ok(semitones)) => Self::Custom(semitones),
                _ => Self::Usage("custom <semitones>"),
            },
            "normal" | "n" | "off" => Self::Off,
            "status" | "s" | "info" => Self::Status,
            _ => return None,
        };

        Some(command)
    }
}

fn parse_direction(argument: Option<&str>) -> GenderDirection {
    // "gender female" means the speaker is female, so shift down
    match argument.map(str::to_lowercase).as_deref() {
        Some("female") | Some("f") => GenderDirection::FemaleToMale,
        _ => GenderDirection::MaleToFemale,
    }
}

pub fn help_text(prefix: &str) -> String {
    format!(
        "`{p}join` / `{p}j` — join your voice channel\n\
         `{p}leave` / `{p}l` — leave the voice channel\n\
         `{p}up` — raised voice (+6 semitones)\n\
         `{p}down` — lowered voice (-6 semitones)\n\
         `{p}gender [male|female]` — cross-gender voice\n\
         `{p}custom <semitones>` — custom shift\n\
         `{p}normal` / `{p}off` — no transformation\n\
         `{p}status` / `{p}s` — show current settings",
        p = prefix
    )
}
