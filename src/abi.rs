//! ABI preference ranking
//!
//! Scores candidate library variants against the host's supported ABI list.
//! A score is the index of the candidate's ABI in that list, so lower is
//! better; ABIs the host does not list are excluded.

/// ABI preferred first by a 64-bit process
pub const ABI_ARM64_V8A: &str = "arm64-v8a";
/// 64-bit x86 ABI
pub const ABI_X86_64: &str = "x86_64";
/// ABI preferred first by a 32-bit ARM process
pub const ABI_ARMEABI_V7A: &str = "armeabi-v7a";
/// 32-bit x86 ABI
pub const ABI_X86: &str = "x86";

const PREFERRED_64BIT: [&str; 2] = [ABI_ARM64_V8A, ABI_X86_64];
const PREFERRED_32BIT: [&str; 2] = [ABI_ARMEABI_V7A, ABI_X86];

/// Raw score returned by [`SupportedAbis::score_raw`] for unsupported ABIs
pub const UNSUPPORTED_SCORE: i32 = -1;

/// Ordered list of ABIs the host supports, most preferred first
///
/// Slots may be empty (`None` or `""`); empty slots never match a candidate
/// but still occupy an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedAbis {
    slots: Vec<Option<String>>,
}

impl SupportedAbis {
    /// Build from raw slots, keeping empty ones in place
    #[must_use]
    pub fn new(slots: Vec<Option<String>>) -> Self {
        Self { slots }
    }

    /// Raw slots in preference order
    #[must_use]
    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Number of slots, including empty ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the list has no slots at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Non-empty ABIs in preference order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_deref())
            .filter(|abi| !abi.is_empty())
    }

    /// Position of the first exact match of `candidate`, or `None` if unsupported
    #[must_use]
    pub fn score(&self, candidate: &str) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_deref()
                .is_some_and(|abi| !abi.is_empty() && abi == candidate)
        })
    }

    /// Like [`score`](Self::score) but with [`UNSUPPORTED_SCORE`] as the sentinel
    #[must_use]
    pub fn score_raw(&self, candidate: &str) -> i32 {
        self.score(candidate)
            .and_then(|index| i32::try_from(index).ok())
            .unwrap_or(UNSUPPORTED_SCORE)
    }

    /// Order candidates by preference, dropping unsupported ones
    ///
    /// The sort is stable: candidates with equal scores keep their input order.
    pub fn rank<S, T, I>(&self, candidates: I) -> Vec<(String, T)>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, T)>,
    {
        let mut scored: Vec<(usize, String, T)> = candidates
            .into_iter()
            .filter_map(|(abi, value)| {
                let abi = abi.into();
                self.score(&abi).map(|score| (score, abi, value))
            })
            .collect();
        scored.sort_by_key(|(score, _, _)| *score);
        scored
            .into_iter()
            .map(|(_, abi, value)| (abi, value))
            .collect()
    }

    /// Most preferred supported candidate, if any
    pub fn best<S, T, I>(&self, candidates: I) -> Option<(String, T)>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, T)>,
    {
        self.rank(candidates).into_iter().next()
    }
}

impl<S: Into<String>> FromIterator<S> for SupportedAbis {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|abi| Some(abi.into())).collect())
    }
}

/// Move the ABI family matching the process bitness to the front
///
/// This is a stable partition, not a sort: ABIs inside the preferred bucket
/// and inside the remainder keep their relative order.
#[must_use]
pub fn prefer_process_bitness(abis: Vec<String>, is_64bit: bool) -> Vec<String> {
    let preferred: &[&str] = if is_64bit {
        &PREFERRED_64BIT
    } else {
        &PREFERRED_32BIT
    };
    let (mut front, back): (Vec<String>, Vec<String>) = abis
        .into_iter()
        .partition(|abi| preferred.contains(&abi.as_str()));
    front.extend(back);
    front
}
