//! Section and entry scanner for `PeripheralPins.c`-style listings.
//!
//! ```c
//! WEAK const PinMap PinMap_SPI_MOSI[] = {
//!   {PA_7,       SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
//!   {PA_10_ALT1, SPI5, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI5)},
//!   {NC,         NP,   0}
//! };
//! ```

use std::ops::Range;

/// One `{pin, peripheral, descriptor}` tuple, borrowed from the cleaned source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    pub pin: &'a str,
    pub peripheral: &'a str,
    pub descriptor: &'a str,
    pub span: Range<usize>,
}

/// Blanks out `//` and `/* */` comments and preprocessor lines, keeping
/// line structure so byte offsets stay meaningful.
pub fn strip_comments(src: &str) -> String {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut pos = 0;
    let mut line_start = true;

    while pos < len {
        let c = bytes[pos];
        if line_start {
            let indent = src[pos..].len() - src[pos..].trim_start_matches([' ', '\t']).len();
            if src[pos + indent..].starts_with('#') {
                let end = src[pos..].find('\n').map(|i| pos + i).unwrap_or(len);
                pos = end;
                line_start = false;
                continue;
            }
        }
        if c == b'/' && pos + 1 < len && bytes[pos + 1] == b'/' {
            while pos < len && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if c == b'/' && pos + 1 < len && bytes[pos + 1] == b'*' {
            pos += 2;
            while pos < len && !(bytes[pos] == b'*' && pos + 1 < len && bytes[pos + 1] == b'/') {
                if bytes[pos] == b'\n' {
                    out.push('\n');
                }
                pos += 1;
            }
            pos = (pos + 2).min(len);
            out.push(' ');
            line_start = false;
            continue;
        }
        // Copy one full character so multi-byte text stays intact.
        let ch = src[pos..].chars().next().unwrap_or(' ');
        out.push(ch);
        line_start = ch == '\n';
        pos += ch.len_utf8();
    }
    out
}

/// Body of the array literal named `name`, between its outer braces.
/// `None` when the listing has no such section.
pub fn section_body<'a>(src: &'a str, name: &str) -> Option<(usize, &'a str)> {
    let needle = format!("{}[]", name);
    let mut search_from = 0;
    let start = loop {
        let found = search_from + src[search_from..].find(&needle)?;
        let preceded_by_ident = src[..found]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if !preceded_by_ident {
            break found + needle.len();
        }
        search_from = found + needle.len();
    };

    let open = start + src[start..].find('{')?;
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let body_start = open + 1;
                    return Some((body_start, &src[body_start..open + offset]));
                }
            }
            _ => {}
        }
    }
    tracing::debug!("Section {} is not terminated", name);
    None
}

/// Tuples of one section, plus how many could not be split into
/// `{pin, peripheral, descriptor}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionEntries<'a> {
    pub entries: Vec<RawEntry<'a>>,
    pub malformed: usize,
}

/// Top-level `{...}` tuples of a section body, stopping at the `{NC, ...}`
/// terminator. `base` is the body's offset in the source, used for spans.
pub fn entries(body: &str, base: usize) -> SectionEntries<'_> {
    let bytes = body.as_bytes();
    let mut found = SectionEntries::default();
    let mut depth = 0usize;
    let mut open = 0usize;

    for (pos, b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    open = pos;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let inner = &body[open + 1..pos];
                    let Some(entry) = split_entry(inner, base + open..base + pos + 1) else {
                        tracing::debug!("Skipping malformed pin map entry: {{{}}}", inner.trim());
                        found.malformed += 1;
                        continue;
                    };
                    if entry.pin == "NC" {
                        break;
                    }
                    found.entries.push(entry);
                }
            }
            _ => {}
        }
    }
    found
}

fn split_entry(inner: &str, span: Range<usize>) -> Option<RawEntry<'_>> {
    let mut parts = inner.splitn(3, ',');
    let pin = parts.next()?.trim();
    let peripheral = parts.next()?.trim();
    let descriptor = parts.next()?.trim();
    if pin.is_empty() || peripheral.is_empty() {
        return None;
    }
    Some(RawEntry {
        pin,
        peripheral,
        descriptor,
        span,
    })
}

/// Arguments of `NAME(a, b, c)`, trimmed. `None` if `descriptor` is not a
/// call of `name`.
pub fn call_args<'a>(descriptor: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let rest = descriptor.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
#ifdef HAL_SPI_MODULE_ENABLED
WEAK const PinMap PinMap_SPI_MOSI[] = {
  {PA_7,       SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
//{PA_10,      SPI5, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI5)},
  /* {PB_5,    SPI3, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI3)}, */
  {PB_5_ALT1,  SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)}, // SPI1_MOSI
  {NC,         NP,   0}
};
#endif
"#;

    #[test]
    fn test_comments_and_directives_removed() {
        let clean = strip_comments(LISTING);
        assert!(!clean.contains("PA_10"));
        assert!(!clean.contains("PB_5,"));
        assert!(!clean.contains("#ifdef"));
        assert!(clean.contains("PB_5_ALT1"));
        assert_eq!(clean.lines().count(), LISTING.lines().count());
    }

    #[test]
    fn test_section_entries() {
        let clean = strip_comments(LISTING);
        let (base, body) = section_body(&clean, "PinMap_SPI_MOSI").unwrap();
        let found = entries(body, base).entries;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].pin, "PA_7");
        assert_eq!(found[0].peripheral, "SPI1");
        assert!(found[0].descriptor.starts_with("STM_PIN_DATA("));
        assert_eq!(found[1].pin, "PB_5_ALT1");
        assert!(clean[found[1].span.clone()].starts_with("{PB_5_ALT1"));
    }

    #[test]
    fn test_malformed_tuples_counted() {
        let body = "\n  {PA_7, SPI1, STM_PIN_DATA(STM_MODE_AF_PP)},\n  {PA_9}\n  {, SPI2, 0},\n  {NC, NP, 0}\n";
        let found = entries(body, 0);
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.malformed, 2);
    }

    #[test]
    fn test_missing_section() {
        let clean = strip_comments(LISTING);
        assert!(section_body(&clean, "PinMap_I2C_SDA").is_none());
        assert!(section_body(&clean, "SPI_MOSI").is_none());
    }

    #[test]
    fn test_call_args() {
        let args = call_args(
            "STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)",
            "STM_PIN_DATA_EXT",
        )
        .unwrap();
        assert_eq!(args, vec!["STM_MODE_AF_PP", "GPIO_PULLUP", "GPIO_AF2_TIM3", "1", "0"]);
        assert!(call_args("STM_PIN_DATA(STM_MODE_AF_PP)", "STM_PIN_DATA_EXT").is_none());
    }
}
