use super::types::{DecodedSong, Tick, TempoBreakpoint, TempoMap, Timestamp, DEFAULT_TEMPO};
use super::types::MidiEvent;

/// Collect every tempo event across all tracks into one tick-sorted map.
///
/// The sort is stable, so breakpoints sharing a tick keep track order and the
/// last one wins.
pub fn build_tempo_map(song: &DecodedSong) -> TempoMap {
    let mut breakpoints = Vec::new();

    for track in &song.tracks {
        let mut track_tick: Tick = 0;
        for event in track {
            track_tick += u64::from(event.delta);
            if let MidiEvent::Tempo { mpqn } = event.event {
                breakpoints.push(TempoBreakpoint {
                    tick: track_tick,
                    tempo: mpqn,
                });
            }
        }
    }

    breakpoints.sort_by_key(|change| change.tick);

    TempoMap {
        breakpoints,
        ticks_per_quarter: song.ticks_per_quarter,
    }
}

pub fn ticks_to_ms(ticks: Tick, tempo_map: &TempoMap) -> Timestamp {
    let mut current_tick: Tick = 0;
    let mut current_tempo = DEFAULT_TEMPO;
    // Accumulated in tick-microseconds so no rounding happens until the end
    let mut elapsed: u128 = 0;

    for change in &tempo_map.breakpoints {
        if change.tick > ticks {
            break;
        }
        elapsed += change.tick.saturating_sub(current_tick) as u128 * current_tempo as u128;
        current_tick = change.tick;
        current_tempo = change.tempo;
    }

    elapsed += (ticks - current_tick) as u128 * current_tempo as u128;

    // Convert to milliseconds at the end to maintain precision
    (elapsed / (tempo_map.ticks_per_quarter as u128 * 1000)) as Timestamp
}

impl TempoMap {
    pub fn ticks_to_ms(&self, ticks: Tick) -> Timestamp {
        ticks_to_ms(ticks, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::types::TimedEvent;

    fn map(breakpoints: &[(Tick, u32)], ticks_per_quarter: u16) -> TempoMap {
        TempoMap {
            breakpoints: breakpoints
                .iter()
                .map(|&(tick, tempo)| TempoBreakpoint { tick, tempo })
                .collect(),
            ticks_per_quarter,
        }
    }

    #[test]
    fn test_default_tempo_quarter_note() {
        assert_eq!(ticks_to_ms(480, &map(&[], 480)), 500);
        assert_eq!(ticks_to_ms(0, &map(&[], 480)), 0);
    }

    #[test]
    fn test_single_breakpoint_at_zero() {
        assert_eq!(ticks_to_ms(480, &map(&[(0, 1_000_000)], 480)), 1000);
    }

    #[test]
    fn test_tempo_change_mid_song() {
        // One quarter at 120 BPM, then one quarter at 60 BPM
        let tempo_map = map(&[(0, 500_000), (480, 1_000_000)], 480);
        assert_eq!(tempo_map.ticks_to_ms(480), 500);
        assert_eq!(tempo_map.ticks_to_ms(720), 1000);
        assert_eq!(tempo_map.ticks_to_ms(960), 1500);
    }

    #[test]
    fn test_breakpoint_after_target_is_ignored() {
        let tempo_map = map(&[(960, 250_000)], 480);
        assert_eq!(tempo_map.ticks_to_ms(480), 500);
    }

    #[test]
    fn test_monotonic_across_tempo_changes() {
        let tempo_map = map(
            &[(0, 700_001), (97, 123_457), (300, 2_000_000), (301, 1), (1000, 499_999)],
            96,
        );
        let mut previous = 0;
        for tick in 0..2000 {
            let ms = tempo_map.ticks_to_ms(tick);
            assert!(ms >= previous, "time went backwards at tick {}", tick);
            previous = ms;
        }
    }

    #[test]
    fn test_build_tempo_map_sorts_across_tracks() {
        let song = DecodedSong {
            ticks_per_quarter: 480,
            tracks: vec![
                vec![
                    TimedEvent::new(100, MidiEvent::Other),
                    TimedEvent::new(860, MidiEvent::Tempo { mpqn: 400_000 }),
                ],
                vec![TimedEvent::new(480, MidiEvent::Tempo { mpqn: 600_000 })],
            ],
        };

        let tempo_map = build_tempo_map(&song);
        assert_eq!(
            tempo_map.breakpoints,
            vec![
                TempoBreakpoint { tick: 480, tempo: 600_000 },
                TempoBreakpoint { tick: 960, tempo: 400_000 },
            ]
        );
        assert_eq!(tempo_map.ticks_per_quarter, 480);
    }

    #[test]
    fn test_build_tempo_map_without_tempo_events() {
        let song = DecodedSong {
            ticks_per_quarter: 96,
            tracks: vec![vec![TimedEvent::new(10, MidiEvent::NoteOff { note: 60 })]],
        };
        assert!(build_tempo_map(&song).breakpoints.is_empty());
    }
}
