//! Beam search decoding for sequence generation

use std::cmp::Ordering;

use anyhow::Result;

use super::DecodingConfig;

/// A partial output sequence tracked by the decoder.
#[derive(Clone, Debug)]
pub struct Hypothesis {
    /// Decoder token sequence so far, including the start token.
    pub tokens: Vec<u32>,

    /// Cumulative log probability of the generated tokens.
    pub log_prob: f32,

    /// Whether the sequence hit the end-of-sequence token.
    pub finished: bool,
}

impl Hypothesis {
    fn start(start_token_id: u32) -> Self {
        Self {
            tokens: vec![start_token_id],
            log_prob: 0.0,
            finished: false,
        }
    }

    /// Length-normalized score; the start token does not count.
    pub fn score(&self) -> f32 {
        let generated = self.tokens.len().saturating_sub(1);
        if generated == 0 {
            self.log_prob
        } else {
            self.log_prob / generated as f32
        }
    }
}

/// Beam search decoder with a fixed width and length bound.
///
/// The decoder is model-agnostic: each step it hands the live hypotheses to a
/// caller-supplied closure that scores the next-token candidates, typically by
/// running the decoder network once per hypothesis.
pub struct BeamSearchDecoder {
    beam_width: usize,
    max_length: usize,
    eos_token_id: u32,
    suppressed_tokens: Vec<u32>,
}

impl BeamSearchDecoder {
    /// Build a decoder from the fixed decoding configuration.
    pub fn from_config(config: &DecodingConfig, eos_token_id: u32) -> Self {
        Self {
            beam_width: config.num_beams.max(1),
            max_length: config.max_length,
            eos_token_id,
            suppressed_tokens: config.suppressed_tokens.clone(),
        }
    }

    /// Decode starting from `start_token_id`, driving `step` until every beam
    /// finished or the length bound is hit.
    ///
    /// `step` receives the current hypothesis prefixes and returns, per
    /// hypothesis, candidate `(token_id, log_prob)` pairs; candidates on the
    /// suppression list are discarded here, so the step function does not need
    /// to know about them.
    ///
    /// Returns the generated tokens of the best hypothesis, without the start
    /// token and without the end-of-sequence token.
    pub fn decode<F>(&self, start_token_id: u32, mut step: F) -> Result<Vec<u32>>
    where
        F: FnMut(&[Hypothesis]) -> Result<Vec<Vec<(u32, f32)>>>,
    {
        let mut beam = vec![Hypothesis::start(start_token_id)];
        let mut finished: Vec<Hypothesis> = Vec::new();

        for _ in 0..self.max_length {
            let live: Vec<Hypothesis> = beam.iter().filter(|h| !h.finished).cloned().collect();
            if live.is_empty() {
                break;
            }

            let candidates_per_hyp = step(&live)?;

            let mut candidates: Vec<Hypothesis> = Vec::new();
            for (hypothesis, next_tokens) in live.iter().zip(candidates_per_hyp) {
                for (token_id, log_prob) in next_tokens {
                    if self.suppressed_tokens.contains(&token_id) {
                        continue;
                    }

                    let mut extended = hypothesis.clone();
                    extended.tokens.push(token_id);
                    extended.log_prob += log_prob;

                    if token_id == self.eos_token_id {
                        extended.finished = true;
                        finished.push(extended);
                    } else {
                        candidates.push(extended);
                    }
                }
            }

            candidates.sort_by(|a, b| Self::compare(b, a));
            candidates.truncate(self.beam_width);
            beam = candidates;
        }

        // Unfinished beams still compete when nothing reached EOS in time.
        finished.extend(beam);
        let best = finished
            .into_iter()
            .max_by(|a, b| Self::compare(a, b))
            .unwrap_or_else(|| Hypothesis::start(start_token_id));

        let mut tokens = best.tokens;
        tokens.remove(0);
        if best.finished {
            tokens.pop();
        }
        Ok(tokens)
    }

    fn compare(a: &Hypothesis, b: &Hypothesis) -> Ordering {
        a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal)
    }
}
