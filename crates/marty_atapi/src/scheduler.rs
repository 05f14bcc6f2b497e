/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    scheduler.rs

    A virtual-time event queue, serviced by the machine between instruction
    groups.

*/

#[derive(Clone, Debug)]
struct ScheduledEvent<E> {
    deadline: u64,
    seq: u64,
    event: E,
}

/// Single global queue of timed events, measured in CPU cycles.
///
/// An event value may only be pending once: scheduling it again moves its deadline.
#[derive(Clone, Debug)]
pub struct Scheduler<E> {
    now: u64,
    seq: u64,
    queue: Vec<ScheduledEvent<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now: 0,
            seq: 0,
            queue: Vec::new(),
        }
    }
}

impl<E: Copy + PartialEq> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in cycles.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, event: E, delay: u64) {
        self.cancel(event);
        let deadline = self.now.saturating_add(delay);
        let seq = self.seq;
        self.seq += 1;

        // Keep the queue sorted by (deadline, seq).
        let pos = self
            .queue
            .iter()
            .position(|e| (e.deadline, e.seq) > (deadline, seq))
            .unwrap_or(self.queue.len());
        self.queue.insert(pos, ScheduledEvent { deadline, seq, event });
    }

    pub fn cancel(&mut self, event: E) {
        self.queue.retain(|e| e.event != event);
    }

    pub fn is_pending(&self, event: E) -> bool {
        self.queue.iter().any(|e| e.event == event)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.first().map(|e| e.deadline)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance virtual time by `cycles` and return every event that came due, oldest first.
    pub fn advance(&mut self, cycles: u64) -> Vec<E> {
        self.now = self.now.saturating_add(cycles);
        let due = self.queue.iter().take_while(|e| e.deadline <= self.now).count();
        self.queue.drain(..due).map(|e| e.event).collect()
    }

    /// Advance virtual time directly to the next pending deadline and return the events due
    /// at that time. Returns an empty vector if nothing is pending.
    pub fn advance_to_next(&mut self) -> Vec<E> {
        match self.next_deadline() {
            Some(deadline) => {
                let delta = deadline.saturating_sub(self.now);
                self.advance(delta)
            }
            None => Vec::new(),
        }
    }
}
