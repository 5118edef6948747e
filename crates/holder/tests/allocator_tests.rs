mod allocators {
    use holder::{
        AllocationCounter, AllocationSink, Error, Global, RecordKind, SharedPtr, Tracked,
        UniquePtr, allocate_shared, allocate_shared_with, try_make_shared,
    };
    use holder_test_utils::{
        AllocationEvent, CountingDeleter, DropCounter, FailingAllocator, RecordingSink,
    };
    use parking_lot::Mutex;
    use std::{alloc::Layout, sync::Arc};

    #[test]
    fn record_is_stored_with_the_provided_allocator() {
        let counter = Arc::new(AllocationCounter::default());
        let deleter = CountingDeleter::default();
        let raw = Box::into_raw(Box::new(7u64));

        let shared = unsafe {
            SharedPtr::from_raw_in(raw, deleter.clone(), Tracked::new(Global, counter.clone()))
        }
        .unwrap();
        assert_eq!(SharedPtr::record_kind(&shared), Some(RecordKind::DetachedInAllocator));
        assert_eq!(counter.live_allocations(), 1);

        let copy = shared.clone();
        assert_eq!(counter.allocations(), 1);

        drop(shared);
        drop(copy);
        assert_eq!(deleter.count(), 1);
        assert_eq!(counter.deallocations(), 1);
        assert_eq!(counter.live_bytes(), 0);
    }

    #[test]
    fn failed_record_allocation_invokes_the_deleter() {
        let deleter = CountingDeleter::default();
        let raw = Box::into_raw(Box::new(String::from("orphan")));

        let result =
            unsafe { SharedPtr::from_raw_in(raw, deleter.clone(), FailingAllocator::always()) };

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
        assert_eq!(deleter.count(), 1);
    }

    #[test]
    fn unique_pointer_converted_with_an_allocator() {
        let counter = Arc::new(AllocationCounter::default());
        let deleter = CountingDeleter::default();
        let raw = Box::into_raw(Box::new(String::from("converted")));
        let owned = unsafe { UniquePtr::from_raw_with_deleter(raw, deleter.clone()) };

        let shared =
            SharedPtr::try_from_unique_in(owned, Tracked::new(Global, counter.clone())).unwrap();
        assert_eq!(SharedPtr::record_kind(&shared), Some(RecordKind::DetachedInAllocator));
        assert_eq!(SharedPtr::use_count(&shared), 1);
        assert_eq!(shared.as_str(), "converted");
        assert_eq!(counter.live_allocations(), 1);

        drop(shared);
        assert_eq!(deleter.count(), 1);
        assert_eq!(counter.live_allocations(), 0);
    }

    #[test]
    fn failed_conversion_from_unique_invokes_the_deleter() {
        let deleter = CountingDeleter::default();
        let raw = Box::into_raw(Box::new(3u16));
        let owned = unsafe { UniquePtr::from_raw_with_deleter(raw, deleter.clone()) };

        let result = SharedPtr::try_from_unique_in(owned, FailingAllocator::always());

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
        assert_eq!(deleter.count(), 1);
    }

    #[test]
    fn null_unique_pointer_doesnt_allocate() {
        let owned: UniquePtr<u16> = UniquePtr::null();

        let shared = SharedPtr::try_from_unique_in(owned, FailingAllocator::always()).unwrap();

        assert!(SharedPtr::is_null(&shared));
        assert_eq!(SharedPtr::use_count(&shared), 0);
    }

    #[test]
    fn failed_reset_leaves_the_pointer_unchanged() {
        let drops = DropCounter::default();
        let mut shared = SharedPtr::new(drops.track(1));
        let deleter = CountingDeleter::default();

        let result = unsafe {
            SharedPtr::reset_raw_in(
                &mut shared,
                drops.boxed(2),
                deleter.clone(),
                FailingAllocator::always(),
            )
        };

        assert!(result.is_err());
        assert_eq!(deleter.count(), 1);
        assert_eq!(drops.count(), 1);
        assert_eq!(**shared, 1);
        assert_eq!(SharedPtr::use_count(&shared), 1);
    }

    #[test]
    fn allocate_shared_uses_a_single_block() {
        let sink = Arc::new(RecordingSink::default());
        let drops = DropCounter::default();

        let shared = allocate_shared(Tracked::new(Global, sink.clone()), drops.track([0u8; 24]))
            .unwrap();
        assert_eq!(SharedPtr::record_kind(&shared), Some(RecordKind::CoLocated));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let AllocationEvent::Allocated(layout) = events[0] else {
            panic!("Expected an allocation, found {:?}", events[0]);
        };
        assert!(layout.size() > size_of::<[u8; 24]>());

        drop(shared);
        assert_eq!(drops.count(), 1);
        assert_eq!(
            sink.events(),
            [
                AllocationEvent::Allocated(layout),
                AllocationEvent::Deallocated(layout)
            ]
        );
    }

    #[test]
    fn value_is_destroyed_before_the_block_is_released() {
        #[derive(Default)]
        struct Log(Mutex<Vec<&'static str>>);

        impl AllocationSink for Log {
            fn allocated(&self, _: Layout) {
                self.0.lock().push("allocated");
            }

            fn deallocated(&self, _: Layout) {
                self.0.lock().push("deallocated");
            }
        }

        struct Payload(Arc<Log>);

        impl Drop for Payload {
            fn drop(&mut self) {
                self.0.0.lock().push("dropped");
            }
        }

        let log = Arc::new(Log::default());
        let shared = allocate_shared(Tracked::new(Global, log.clone()), Payload(log.clone()));
        drop(shared);

        assert_eq!(*log.0.lock(), ["allocated", "dropped", "deallocated"]);
    }

    #[test]
    fn failed_colocated_allocation_drops_the_value() {
        let drops = DropCounter::default();

        let result = allocate_shared(FailingAllocator::always(), drops.track(1));

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
        assert_eq!(drops.count(), 1);
    }

    #[test]
    fn initializer_isnt_called_when_allocation_fails() {
        let mut called = false;

        let result = allocate_shared_with(FailingAllocator::always(), || {
            called = true;
            1
        });

        assert!(result.is_err());
        assert!(!called);
    }

    #[test]
    fn allocator_can_succeed_before_failing() {
        let allocator = Arc::new(FailingAllocator::after(1));

        let first = allocate_shared(allocator.clone(), 1);
        let second = allocate_shared(allocator.clone(), 2);

        assert_eq!(*first.unwrap(), 1);
        assert!(second.is_err());
    }

    #[test]
    fn failed_allocation_reports_the_requested_layout() {
        let sink = Arc::new(RecordingSink::default());
        let shared = allocate_shared(Tracked::new(Global, sink.clone()), 0u32).unwrap();
        let AllocationEvent::Allocated(expected) = sink.events()[0] else {
            panic!("Expected an allocation");
        };
        drop(shared);

        let error = allocate_shared(FailingAllocator::always(), 0u32).unwrap_err();
        assert_eq!(error, Error::AllocationFailed { layout: expected });
    }

    #[test]
    fn try_make_shared_succeeds_with_the_global_allocator() {
        let shared = try_make_shared(String::from("global")).unwrap();
        assert_eq!(shared.as_str(), "global");
        assert_eq!(SharedPtr::record_kind(&shared), Some(RecordKind::CoLocated));
    }
}
