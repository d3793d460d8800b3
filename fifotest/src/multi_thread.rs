#[cfg(test)]
mod tests {
    use crossbeam_utils::Backoff;
    use std::sync::{mpsc, Barrier, Mutex};
    use std::thread::spawn;
    use std::time::{Duration, Instant};
    use umfifo::{lock::CsLock, Fifo, Inline};

    cfg_if::cfg_if! {
        if #[cfg(feature = "short-potato")] {
            const ITERS: usize = 10_000;
        } else {
            const ITERS: usize = 1_000_000;
        }
    }

    const TIMEOUT_TX: Duration = Duration::from_millis(10_000);
    const TIMEOUT_RX: Duration = Duration::from_millis(10_100);

    /// A configured lock-free FIFO that outlives the test threads
    fn leaked(depth: u16, item_size: u16) -> &'static mut Fifo<'static> {
        let len = depth as usize * item_size as usize;
        let buf: &'static mut [u8] = Box::leak(vec![0u8; len].into_boxed_slice());
        let fifo: &'static mut Fifo<'static> = Box::leak(Box::new(Fifo::new()));
        fifo.configure(Some(buf), depth, item_size, false).unwrap();
        fifo
    }

    #[test]
    fn sanity_check() {
        let fifo = leaked(64, 4);
        let (mut tx, mut rx) = fifo.split().unwrap();

        let start_tx = Instant::now();
        let start_rx = start_tx;

        let tx_thr = spawn(move || {
            let backoff = Backoff::new();
            for i in 0..ITERS {
                let it = (i as u32).to_le_bytes();
                while tx.write(&it).is_err() {
                    if start_tx.elapsed() > TIMEOUT_TX {
                        panic!("tx timeout, iter {}", i);
                    }
                    backoff.snooze();
                }
                backoff.reset();
            }
        });

        let rx_thr = spawn(move || {
            let backoff = Backoff::new();
            let mut out = [0u8; 4];
            for i in 0..ITERS {
                while rx.read(&mut out).is_err() {
                    if start_rx.elapsed() > TIMEOUT_RX {
                        panic!("rx timeout, iter {}", i);
                    }
                    backoff.snooze();
                }
                backoff.reset();
                assert_eq!(u32::from_le_bytes(out), i as u32, "RX Iter: {}", i);
            }
            rx
        });

        tx_thr.join().unwrap();
        let rx = rx_thr.join().unwrap();
        assert!(rx.empty());
        assert!(!rx.overflowed());
    }

    #[test]
    fn batched_spsc() {
        let fifo = leaked(1000, 1);
        let (mut tx, mut rx) = fifo.split().unwrap();

        let start = Instant::now();

        let tx_thr = spawn(move || {
            let src: Vec<u8> = (0..=255u8).collect();
            let mut sent = 0usize;
            let mut burst = 1u16;
            while sent < ITERS {
                if start.elapsed() > TIMEOUT_TX {
                    panic!("tx timeout, sent {}", sent);
                }
                // Keep the byte stream continuous across bursts
                let off = sent % 256;
                let n = burst.min((256 - off) as u16).min((ITERS - sent) as u16);
                sent += tx.write_n(&src[off..], n) as usize;
                burst = burst % 97 + 1;
            }
        });

        let rx_thr = spawn(move || {
            let mut out = [0u8; 211];
            let mut got = 0usize;
            while got < ITERS {
                if start.elapsed() > TIMEOUT_RX {
                    panic!("rx timeout, got {}", got);
                }
                let n = rx.read_n(&mut out, 211) as usize;
                for (i, by) in out[..n].iter().enumerate() {
                    assert_eq!(*by, ((got + i) & 0xFF) as u8, "RX byte {}", got + i);
                }
                got += n;
            }
            rx
        });

        tx_thr.join().unwrap();
        assert!(rx_thr.join().unwrap().empty());
    }

    #[test]
    fn several_locked_writers() {
        const WRITERS: u8 = 4;
        static BUF: Inline<{ 32 * 4 }> = Inline::new();
        // SAFETY: BUF is only used here
        static FIFO: Fifo<'static, CsLock> = unsafe { Fifo::new_static(&BUF, 32, 4, false) };

        let per_writer = ITERS / 10;
        let start = Instant::now();

        let writers: Vec<_> = (0..WRITERS)
            .map(|id| {
                spawn(move || {
                    let backoff = Backoff::new();
                    for seq in 0..per_writer as u32 {
                        let [a, b, c, _] = seq.to_le_bytes();
                        while FIFO.write(&[id, a, b, c]).is_err() {
                            if start.elapsed() > TIMEOUT_TX {
                                panic!("writer {} timeout, seq {}", id, seq);
                            }
                            backoff.snooze();
                        }
                        backoff.reset();
                    }
                })
            })
            .collect();

        let rx_thr = spawn(move || {
            let mut next = [0u32; WRITERS as usize];
            let mut out = [0u8; 4];
            for _ in 0..per_writer * WRITERS as usize {
                while FIFO.read(&mut out).is_err() {
                    if start.elapsed() > TIMEOUT_RX {
                        panic!("rx timeout, seen {:?}", next);
                    }
                    std::hint::spin_loop();
                }
                let [id, a, b, c] = out;
                let seq = u32::from_le_bytes([a, b, c, 0]);
                // Writers interleave, but each one's items stay in order
                assert_eq!(seq, next[id as usize], "writer {}", id);
                next[id as usize] += 1;
            }
            next
        });

        for w in writers {
            w.join().unwrap();
        }
        let next = rx_thr.join().unwrap();
        assert!(next.iter().all(|n| *n as usize == per_writer));

        #[cfg(feature = "verbose")]
        println!("{} writers done in {:?}", WRITERS, start.elapsed());
    }

    #[test]
    fn racing_locked_writers_lose_nothing() {
        const PER_WRITER: u16 = 10_000;
        static BUF: Inline<{ 2 * PER_WRITER as usize * 2 }> = Inline::new();
        // SAFETY: BUF is only used here
        static FIFO: Fifo<'static, CsLock> =
            unsafe { Fifo::new_static(&BUF, 2 * PER_WRITER, 2, false) };
        static START: Barrier = Barrier::new(2);

        // Both writers start together and never find the FIFO full
        let writers: Vec<_> = (0..2u16)
            .map(|id| {
                spawn(move || {
                    START.wait();
                    for seq in id * PER_WRITER..(id + 1) * PER_WRITER {
                        FIFO.write(&seq.to_le_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        assert_eq!(FIFO.count(), 2 * PER_WRITER);
        let mut seen = vec![false; 2 * PER_WRITER as usize];
        let mut out = [0u8; 2];
        while FIFO.read(&mut out).is_ok() {
            let seq = u16::from_le_bytes(out) as usize;
            assert!(!seen[seq], "item {} stored twice", seq);
            seen[seq] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert!(!FIFO.overflowed());
    }

    #[test]
    fn opposite_transfers_do_not_deadlock() {
        static BUF_A: Inline<32> = Inline::new();
        static BUF_B: Inline<32> = Inline::new();
        // SAFETY: each buffer is only used by its FIFO
        static A: Fifo<'static, Mutex<()>> =
            unsafe { Fifo::new_static_with_lock(&BUF_A, 32, 1, true, Mutex::new(())) };
        static B: Fifo<'static, Mutex<()>> =
            unsafe { Fifo::new_static_with_lock(&BUF_B, 32, 1, true, Mutex::new(())) };

        A.write_n(&[0xA; 32], 32);
        B.write_n(&[0xB; 32], 32);

        let (done_tx, done_rx) = mpsc::channel();
        for (src, dst) in [(&A, &B), (&B, &A)] {
            let done = done_tx.clone();
            spawn(move || {
                for i in 0..ITERS / 10 {
                    src.peek_n_into_other_fifo(dst, 0, 8);
                    if i % 4 == 0 {
                        src.read_n_into_other_fifo(dst, 0, 1);
                    }
                }
                done.send(()).unwrap();
            });
        }

        for _ in 0..2 {
            if done_rx.recv_timeout(TIMEOUT_TX).is_err() {
                panic!("opposite relays deadlocked");
            }
        }
        assert!(A.count() + B.count() <= 64);
    }

    #[test]
    fn dma_style_transfers() {
        let fifo = leaked(100, 2);
        let (mut tx, mut rx) = fifo.split().unwrap();

        let start = Instant::now();

        // The "DMA engine" fills spans and then moves the write index
        let tx_thr = spawn(move || {
            let mut seq = 0u16;
            let mut sent = 0usize;
            while sent < ITERS {
                if start.elapsed() > TIMEOUT_TX {
                    panic!("tx timeout, sent {}", sent);
                }
                let want = (ITERS - sent).min(37) as u16;
                let mut span = tx.get_linear_write_info(0, want);
                if span.is_empty() {
                    std::hint::spin_loop();
                    continue;
                }
                // SAFETY: the span describes free slots and this is the only writer
                let bytes = unsafe { span.as_mut_slice() };
                for it in bytes.chunks_exact_mut(2) {
                    it.copy_from_slice(&seq.to_le_bytes());
                    seq = seq.wrapping_add(1);
                }
                // SAFETY: exactly `span.len()` slots were filled
                unsafe { tx.advance_write_pointer(span.len()) };
                sent += span.len() as usize;
            }
        });

        let rx_thr = spawn(move || {
            let mut seq = 0u16;
            let mut got = 0usize;
            while got < ITERS {
                if start.elapsed() > TIMEOUT_RX {
                    panic!("rx timeout, got {}", got);
                }
                let span = rx.get_linear_read_info(0, 64);
                if span.is_empty() {
                    std::hint::spin_loop();
                    continue;
                }
                // SAFETY: the span describes stored items and this is the only reader
                let bytes = unsafe { span.as_slice() };
                for it in bytes.chunks_exact(2) {
                    assert_eq!(u16::from_le_bytes([it[0], it[1]]), seq, "RX item {}", got);
                    seq = seq.wrapping_add(1);
                    got += 1;
                }
                // SAFETY: the span's items were all consumed
                unsafe { rx.advance_read_pointer(span.len()) };
            }
            rx
        });

        tx_thr.join().unwrap();
        let rx = rx_thr.join().unwrap();
        assert!(rx.empty());
        assert!(!rx.overflowed());
    }
}
