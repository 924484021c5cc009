//! Run-length coding of slice samples as `(run, value)` byte pairs.

use crate::error::Status;

const MAX_RUN: usize = u8::MAX as usize;

/// Appends the run-length coding of `samples` to `out`.
pub fn encode(samples: impl IntoIterator<Item = u8>, out: &mut Vec<u8>) {
    let mut samples = samples.into_iter();
    let Some(mut value) = samples.next() else {
        return;
    };
    let mut run = 1usize;

    for sample in samples {
        if sample == value && run < MAX_RUN {
            run += 1;
        } else {
            out.push(run as u8);
            out.push(value);
            value = sample;
            run = 1;
        }
    }
    out.push(run as u8);
    out.push(value);
}

/// Fills `out` from the runs at the start of `input` and returns the number
/// of bytes consumed.
///
/// # Errors
///
/// `CorruptFrame` when the input ends early, holds a zero-length run, or a
/// run overshoots `out`.
pub fn decode(input: &[u8], out: &mut [u8]) -> Result<usize, Status> {
    let mut filled = 0;
    let mut consumed = 0;

    while filled < out.len() {
        let [run, value] = input
            .get(consumed..consumed + 2)
            .and_then(|pair| <[u8; 2]>::try_from(pair).ok())
            .ok_or(Status::CorruptFrame)?;
        let run = usize::from(run);
        if run == 0 || filled + run > out.len() {
            return Err(Status::CorruptFrame);
        }
        out[filled..filled + run].fill(value);
        filled += run;
        consumed += 2;
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_split_at_max() {
        let mut out = Vec::new();
        encode(std::iter::repeat_n(7u8, 300), &mut out);
        assert_eq!(out, vec![255, 7, 45, 7]);

        let mut samples = vec![0u8; 300];
        assert_eq!(decode(&out, &mut samples), Ok(4));
        assert!(samples.iter().all(|&s| s == 7));
    }

    #[test]
    fn test_mixed_samples() {
        let input = [1u8, 1, 2, 3, 3, 3];
        let mut out = Vec::new();
        encode(input, &mut out);
        assert_eq!(out, vec![2, 1, 1, 2, 3, 3]);

        let mut samples = [0u8; 6];
        decode(&out, &mut samples).unwrap();
        assert_eq!(samples, input);
    }

    #[test]
    fn test_decode_stops_at_output_length() {
        let coded = [2u8, 9, 1, 4, 5, 5];
        let mut samples = [0u8; 3];
        assert_eq!(decode(&coded, &mut samples), Ok(4));
        assert_eq!(samples, [9, 9, 4]);
    }

    #[test]
    fn test_corrupt_input() {
        let mut samples = [0u8; 4];
        assert_eq!(decode(&[2, 1], &mut samples), Err(Status::CorruptFrame));
        assert_eq!(decode(&[0, 1, 4, 1], &mut samples), Err(Status::CorruptFrame));
        assert_eq!(decode(&[5, 1], &mut samples), Err(Status::CorruptFrame));
        assert_eq!(decode(&[4], &mut samples), Err(Status::CorruptFrame));
    }

    #[test]
    fn test_empty_input() {
        let mut out = Vec::new();
        encode(std::iter::empty(), &mut out);
        assert!(out.is_empty());
        assert_eq!(decode(&[], &mut []), Ok(0));
    }
}
