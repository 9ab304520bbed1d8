/// Substring filter over the decimal rendering of an id.
///
/// An id matches when its decimal form contains the trimmed filter text. An
/// empty filter matches every id. Matching never allocates, since a single
/// page query may scan the whole base range.
#[derive(Clone, Copy, Debug)]
pub struct IdFilter<'a> {
    needle: &'a [u8],
}

impl<'a> IdFilter<'a> {
    pub fn new(filter: &'a str) -> Self {
        Self {
            needle: filter.trim().as_bytes(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, id: u64) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        let mut buf = [0u8; 20];
        let digits = decimal(id, &mut buf);
        digits.windows(self.needle.len()).any(|w| w == self.needle)
    }
}

fn decimal(mut id: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (id % 10) as u8;
        id /= 10;
        if id == 0 {
            break;
        }
    }
    &buf[start..]
}
