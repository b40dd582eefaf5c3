//! Fixed-width text layout for a single display row.

use core::fmt::Display;
use core::str::Chars;

/// How text is placed within a row when written with `write_text`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Justify {
    /// Text starts at the cursor, padded with spaces on the right.
    #[default]
    Left,
    /// Text ends at the last column, padded with spaces on the left.
    Right,
    /// Text is centered. An odd leftover space goes on the right.
    Center,
}

impl From<&Justify> for &'static str {
    fn from(justify: &Justify) -> Self {
        match justify {
            Justify::Left => "left",
            Justify::Right => "right",
            Justify::Center => "center",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Justify {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

impl Display for Justify {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Iterator over exactly `width` character bytes: left padding, the (possibly truncated)
/// text, then right padding.
pub struct JustifiedText<'a> {
    chars: Chars<'a>,
    left_pad: usize,
    text_len: usize,
    right_pad: usize,
}

impl<'a> JustifiedText<'a> {
    pub fn new(text: &'a str, width: usize, justify: Justify) -> Self {
        let text_len = text.chars().count().min(width);
        let padding = width - text_len;
        let (left_pad, right_pad) = match justify {
            Justify::Left => (0, padding),
            Justify::Right => (padding, 0),
            Justify::Center => (padding / 2, padding - padding / 2),
        };
        Self {
            chars: text.chars(),
            left_pad,
            text_len,
            right_pad,
        }
    }
}

impl Iterator for JustifiedText<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.left_pad > 0 {
            self.left_pad -= 1;
            return Some(b' ');
        }
        if self.text_len > 0 {
            self.text_len -= 1;
            return self.chars.next().map(|c| c as u8);
        }
        if self.right_pad > 0 {
            self.right_pad -= 1;
            return Some(b' ');
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.left_pad + self.text_len + self.right_pad;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for JustifiedText<'_> {}
