//! Line classifier for unified target configs.
//!
//! Each trimmed line is matched against the shapes the converter knows and
//! turned into one borrowed [`TargetLine`]. Anything else is
//! [`TargetLine::Unrecognized`]; the target format keeps growing new
//! directives and those must not break a conversion.

/// One classified line of a target config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLine<'a> {
    /// `# Betaflight / STM32F411 (S411) 4.2.0 ...`
    Header { mcu: Option<&'a str> },
    BoardName(&'a str),
    ManufacturerId(&'a str),
    /// Whole `#define ...` line.
    Define(&'a str),
    Resource {
        resource_type: &'a str,
        index: u32,
        pin: &'a str,
    },
    /// `timer B04 AF2`
    Timer { pin: &'a str, af: u8 },
    /// `# pin B04: TIM3 CH1 (AF2)`
    TimerNote {
        pin: &'a str,
        timer: &'a str,
        channel: u8,
    },
    /// `dma pin B04 0` or `dma ADC 1 1`, keyed `B04` / `ADC_1`.
    Dma { target: String, stream: u8 },
    /// `# pin B04: DMA1 Stream 4 Channel 5` or `# ADC 1: DMA2 Stream 0 Channel 0`
    DmaNote { target: String, channel: u8 },
    Feature(&'a str),
    Setting { key: &'a str, value: &'a str },
    Unrecognized,
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn word(s: Option<&str>) -> Option<&str> {
    s.filter(|w| is_word(w))
}

/// Classifies a single line. Leading and trailing whitespace is ignored.
pub fn classify(line: &str) -> TargetLine<'_> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('#') {
        return classify_comment(line, rest.trim());
    }

    let mut tokens = line.split_whitespace();
    let parsed = match tokens.next() {
        Some("board_name") => word(tokens.next()).map(TargetLine::BoardName),
        Some("manufacturer_id") => word(tokens.next()).map(TargetLine::ManufacturerId),
        Some("resource") => parse_resource(&mut tokens),
        Some("timer") => parse_timer(&mut tokens),
        Some("dma") => parse_dma(&mut tokens),
        Some("feature") => word(tokens.next()).map(TargetLine::Feature),
        Some("set") => parse_setting(line),
        _ => None,
    };
    parsed.unwrap_or(TargetLine::Unrecognized)
}

fn classify_comment<'a>(line: &'a str, body: &'a str) -> TargetLine<'a> {
    if line.starts_with("#define") {
        return TargetLine::Define(line);
    }
    if body.contains("Betaflight") {
        let mcu = body
            .split_whitespace()
            .find(|token| token.starts_with("STM32"))
            .map(|token| {
                let end = token
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(token.len());
                &token[..end]
            });
        return TargetLine::Header { mcu };
    }
    let Some((subject, detail)) = body.split_once(':') else {
        return TargetLine::Unrecognized;
    };
    parse_timer_note(subject, detail)
        .or_else(|| parse_dma_note(subject, detail))
        .unwrap_or(TargetLine::Unrecognized)
}

fn parse_resource<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<TargetLine<'a>> {
    let resource_type = word(tokens.next())?;
    let index = tokens.next()?.parse::<u32>().ok().filter(|i| *i > 0)?;
    let pin = word(tokens.next())?;
    Some(TargetLine::Resource {
        resource_type,
        index,
        pin,
    })
}

fn parse_timer<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<TargetLine<'a>> {
    let pin = word(tokens.next())?;
    let af = tokens
        .next()?
        .strip_prefix("AF")?
        .parse()
        .ok()
        .filter(|af: &u8| (1..=15).contains(af))?;
    Some(TargetLine::Timer { pin, af })
}

fn parse_dma<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<TargetLine<'a>> {
    let first = word(tokens.next())?;
    if first == "pin" {
        let pin = word(tokens.next())?;
        let stream = tokens.next()?.parse().ok()?;
        return Some(TargetLine::Dma {
            target: pin.to_string(),
            stream,
        });
    }
    let index: u32 = tokens.next()?.parse().ok()?;
    let stream = tokens.next()?.parse().ok()?;
    Some(TargetLine::Dma {
        target: format!("{}_{}", first, index),
        stream,
    })
}

fn parse_setting(line: &str) -> Option<TargetLine<'_>> {
    let rest = line.strip_prefix("set")?;
    let (key, value) = rest.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if !is_word(key) || value.is_empty() {
        return None;
    }
    Some(TargetLine::Setting { key, value })
}

/// Channel token such as `CH1`, or `CH2N` for a complementary output.
fn parse_channel(token: &str) -> Option<u8> {
    let digits = token.strip_prefix("CH")?;
    let digits = digits.strip_suffix('N').unwrap_or(digits);
    digits.parse().ok()
}

fn parse_timer_note<'a>(subject: &'a str, detail: &'a str) -> Option<TargetLine<'a>> {
    let mut subject = subject.split_whitespace();
    if subject.next()? != "pin" {
        return None;
    }
    let pin = word(subject.next())?;
    let mut detail = detail.split_whitespace();
    let timer = word(detail.next())?;
    let channel = parse_channel(detail.next()?)?;
    Some(TargetLine::TimerNote {
        pin,
        timer,
        channel,
    })
}

fn parse_dma_note<'a>(subject: &str, detail: &str) -> Option<TargetLine<'a>> {
    let mut detail = detail.split_whitespace();
    if !detail.next()?.starts_with("DMA") {
        return None;
    }
    let mut channel = None;
    while let Some(token) = detail.next() {
        if token == "Channel" {
            channel = detail.next().and_then(|c| c.parse().ok());
        }
    }
    let channel = channel?;

    let mut subject = subject.split_whitespace();
    let first = word(subject.next())?;
    let target = if first == "pin" {
        word(subject.next())?.to_string()
    } else {
        let index: u32 = subject.next()?.parse().ok()?;
        format!("{}_{}", first, index)
    };
    Some(TargetLine::DmaNote { target, channel })
}
