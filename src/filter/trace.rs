use crate::filter::{FilterError, FilterResult};
use crate::packet::Packets;
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Delivers packets only at prerecorded delivery opportunities.
///
/// The trace holds one nanosecond timestamp per line, strictly ascending.
/// Opportunities are replayed relative to the first entry. Each opportunity
/// releases at most one queued packet that had already arrived by then; an
/// opportunity with nothing waiting is lost. Once the trace is exhausted
/// nothing more is delivered.
#[derive(Debug)]
pub struct TraceBasedDeliveryFilter {
    handle: ProcessorHandle,
    delivery_times_us: Vec<i64>,
    next_delivery: usize,
    local_time_us: i64,
    queue: Packets,
}

impl TraceBasedDeliveryFilter {
    pub fn new(listener: Option<ListenerRef>) -> Self {
        Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Filter, "TraceBasedDeliveryFilter"),
            delivery_times_us: Vec::new(),
            next_delivery: 0,
            local_time_us: 0,
            queue: Packets::new(),
        }
    }

    /// Load a trace file. On failure the filter stays inert until a later
    /// successful call.
    pub fn init(&mut self, path: impl AsRef<Path>) -> FilterResult<()> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                self.reset();
                tracing::warn!(?path, error = %source, "failed to open delivery trace");
                return Err(FilterError::TraceIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.init_from_reader(BufReader::new(file)).map_err(|e| match e {
            FilterError::TraceIo { source, .. } => FilterError::TraceIo {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn init_from_reader<R: BufRead>(&mut self, reader: R) -> FilterResult<()> {
        match parse_trace(reader) {
            Ok(delivery_times_us) => {
                tracing::debug!(opportunities = delivery_times_us.len(), "delivery trace loaded");
                self.delivery_times_us = delivery_times_us;
                self.next_delivery = 0;
                self.local_time_us = 0;
                Ok(())
            }
            Err(e) => {
                self.reset();
                tracing::warn!(error = %e, "rejected delivery trace");
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.delivery_times_us.is_empty()
    }

    /// Packets waiting for a delivery opportunity
    pub fn queued_packets(&self) -> usize {
        self.queue.len()
    }

    pub fn remaining_opportunities(&self) -> usize {
        self.delivery_times_us.len() - self.next_delivery
    }

    fn reset(&mut self) {
        self.delivery_times_us.clear();
        self.next_delivery = 0;
        self.local_time_us = 0;
    }
}

fn parse_trace<R: BufRead>(reader: R) -> FilterResult<Vec<i64>> {
    let mut times_ns: Vec<i64> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|source| FilterError::TraceIo {
            path: Default::default(),
            source,
        })?;
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        let timestamp_ns: i64 = value
            .parse()
            .ok()
            .filter(|ns| *ns >= 0)
            .ok_or_else(|| FilterError::TraceParse {
                line: line_number,
                value: value.to_string(),
            })?;
        if let Some(&previous) = times_ns.last() {
            if timestamp_ns <= previous {
                return Err(FilterError::TraceNotAscending { line: line_number });
            }
        }
        times_ns.push(timestamp_ns);
    }

    let first_ns = *times_ns.first().ok_or(FilterError::EmptyTrace)?;
    Ok(times_ns
        .into_iter()
        .map(|ns| (ns - first_ns) / 1000)
        .collect())
}

impl PacketProcessor for TraceBasedDeliveryFilter {
    fn run_for(&mut self, time_ms: i64, in_out: &mut Packets) {
        self.queue.append(in_out);
        if !self.is_initialized() {
            return;
        }

        let window_end_us = self.local_time_us + time_ms * 1000;
        while let Some(&opportunity_us) = self.delivery_times_us.get(self.next_delivery) {
            if opportunity_us > window_end_us {
                break;
            }
            self.next_delivery += 1;
            let ready = self
                .queue
                .front()
                .is_some_and(|p| p.send_time_us() <= opportunity_us);
            if ready {
                if let Some(mut packet) = self.queue.pop_front() {
                    packet.set_send_time_us(opportunity_us);
                    in_out.push_back(packet);
                }
            }
        }
        self.local_time_us = window_end_us;
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{is_time_sorted, Packet};
    use std::io::{Cursor, Write};

    fn packets(times_us: &[i64]) -> Packets {
        times_us
            .iter()
            .enumerate()
            .map(|(i, &t)| Packet::with_sequence_number(t, i as u16))
            .collect()
    }

    fn loaded(trace: &str) -> TraceBasedDeliveryFilter {
        let mut filter = TraceBasedDeliveryFilter::new(None);
        filter.init_from_reader(Cursor::new(trace.to_string())).unwrap();
        filter
    }

    #[test]
    fn test_releases_packets_at_opportunities() {
        // Opportunities at 0, 10, 20, 30 ms relative to the first entry
        let mut filter = loaded("100000000\n110000000\n120000000\n130000000\n");
        assert_eq!(filter.remaining_opportunities(), 4);

        let mut in_out = packets(&[0, 5_000, 6_000]);
        filter.run_for(15, &mut in_out);

        let times: Vec<i64> = in_out.iter().map(|p| p.send_time_us()).collect();
        assert_eq!(times, vec![0, 10_000]);
        assert_eq!(filter.queued_packets(), 1);

        let mut next = Packets::new();
        filter.run_for(15, &mut next);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].send_time_us(), 20_000);
        assert_eq!(next[0].header().sequence_number, 2);
        assert!(is_time_sorted(&next));
    }

    #[test]
    fn test_unused_opportunity_is_lost() {
        let mut filter = loaded("0\n1000000\n2000000\n");

        let mut in_out = packets(&[1_500]);
        filter.run_for(3, &mut in_out);

        // 0 ms and 1 ms come before the packet arrives, 2 ms carries it
        assert_eq!(in_out.len(), 1);
        assert_eq!(in_out[0].send_time_us(), 2_000);
    }

    #[test]
    fn test_exhausted_trace_stops_delivery() {
        let mut filter = loaded("0\n1000000\n");
        let mut in_out = packets(&[0, 0, 0]);
        filter.run_for(10, &mut in_out);
        assert_eq!(in_out.len(), 2);

        let mut later = Packets::new();
        filter.run_for(1000, &mut later);
        assert!(later.is_empty());
        assert_eq!(filter.queued_packets(), 1);
        assert_eq!(filter.remaining_opportunities(), 0);
    }

    #[test]
    fn test_rejects_malformed_traces() {
        let mut filter = TraceBasedDeliveryFilter::new(None);
        assert!(matches!(
            filter.init_from_reader(Cursor::new("100\nabc\n")),
            Err(FilterError::TraceParse { line: 2, .. })
        ));
        assert!(matches!(
            filter.init_from_reader(Cursor::new("100\n100\n")),
            Err(FilterError::TraceNotAscending { line: 2 })
        ));
        assert!(matches!(
            filter.init_from_reader(Cursor::new("-5\n")),
            Err(FilterError::TraceParse { line: 1, .. })
        ));
        assert!(matches!(
            filter.init_from_reader(Cursor::new("\n\n")),
            Err(FilterError::EmptyTrace)
        ));
    }

    #[test]
    fn test_failed_init_leaves_filter_inert() {
        let mut filter = loaded("0\n1000000\n");
        assert!(filter.is_initialized());

        assert!(filter.init("/nonexistent/trace.txt").is_err());
        assert!(!filter.is_initialized());

        let mut in_out = packets(&[0, 100]);
        filter.run_for(100, &mut in_out);
        assert!(in_out.is_empty());
        assert_eq!(filter.queued_packets(), 2);

        // Held packets go out once a trace is loaded
        filter.init_from_reader(Cursor::new("0\n1000000\n")).unwrap();
        filter.run_for(5, &mut in_out);
        assert_eq!(in_out.len(), 2);
    }

    #[test]
    fn test_init_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "5000000").unwrap();
        writeln!(file, "6000000").unwrap();

        let mut filter = TraceBasedDeliveryFilter::new(None);
        filter.init(file.path()).unwrap();
        assert_eq!(filter.remaining_opportunities(), 2);
    }
}
