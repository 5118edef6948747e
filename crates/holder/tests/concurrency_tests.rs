#![cfg(feature = "atomic")]

mod concurrency {
    use holder::{SharedPtr, make_shared};
    use holder_test_utils::{CountingDeleter, DropCounter};
    use parking_lot::Mutex;
    use std::{sync::Barrier, thread};
    use test_case::test_case;

    const STRESS_RUNS: usize = 200;

    // Each thread receives its own handle, then all threads drop their handles at once
    fn drop_simultaneously<T: Send + Sync>(handles: Vec<SharedPtr<T>>) {
        let barrier = Barrier::new(handles.len());

        thread::scope(|s| {
            for handle in handles {
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    drop(handle);
                });
            }
        });
    }

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(8)]
    #[test_case(32)]
    fn exactly_one_teardown(thread_count: usize) {
        for _ in 0..STRESS_RUNS {
            let drops = DropCounter::default();
            let original = make_shared(drops.track(19));

            let mut handles = vec![original.clone(); thread_count - 1];
            handles.push(original);

            drop_simultaneously(handles);
            assert_eq!(drops.count(), 1);
        }
    }

    #[test_case(2)]
    #[test_case(16)]
    fn exactly_one_deleter_call(thread_count: usize) {
        for _ in 0..STRESS_RUNS {
            let deleter = CountingDeleter::default();
            let raw = Box::into_raw(Box::new(String::from("shared")));
            let original = unsafe { SharedPtr::from_raw_with_deleter(raw, deleter.clone()) };

            let mut handles = vec![original.clone(); thread_count - 1];
            handles.push(original);

            drop_simultaneously(handles);
            assert_eq!(deleter.count(), 1);
        }
    }

    #[test]
    fn concurrent_clones_and_drops() {
        const THREADS: usize = 8;
        const CLONES_PER_THREAD: usize = 1000;

        let drops = DropCounter::default();
        let original = make_shared(drops.track(0u64));
        let peak = Mutex::new(0);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let clones: Vec<_> = (0..CLONES_PER_THREAD).map(|_| original.clone()).collect();
                    let count = SharedPtr::use_count(&original);
                    let mut peak = peak.lock();
                    *peak = (*peak).max(count);
                    drop(peak);
                    drop(clones);
                });
            }
        });

        assert!(*peak.lock() > CLONES_PER_THREAD);
        assert_eq!(SharedPtr::use_count(&original), 1);
        assert_eq!(drops.count(), 0);

        drop(original);
        assert_eq!(drops.count(), 1);
    }

    #[test]
    fn aliases_dropped_on_other_threads() {
        let drops = DropCounter::default();
        let parent = make_shared(drops.track((String::from("left"), String::from("right"))));

        let left = SharedPtr::project(&parent, |pair| pair.0.as_str());
        let right = SharedPtr::project(&parent, |pair| pair.1.as_str());
        drop(parent);

        let lengths = thread::scope(|s| {
            let left = s.spawn(move || left.len());
            let right = s.spawn(move || right.len());
            (left.join().unwrap(), right.join().unwrap())
        });

        assert_eq!(lengths, (4, 5));
        assert_eq!(drops.count(), 1);
    }
}
