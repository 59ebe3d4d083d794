#![no_main]
use libfuzzer_sys::fuzz_target;
use memspace_core::{Allocator, AllocatorConfig, AllocatorError, FreeMode};

fuzz_target!(|data: &[u8]| {
    // First two bytes pick the space size and free mode; the rest is a
    // sequence of 3-byte malloc/free/defrag operations.
    if data.len() < 2 {
        return;
    }
    let max_size = usize::from(data[0]) * 4 + 1;
    let free_mode = if data[1] & 1 == 1 {
        FreeMode::Strict
    } else {
        FreeMode::Parity
    };
    let Ok(mut space) =
        Allocator::with_config(AllocatorConfig::new(max_size).with_free_mode(free_mode))
    else {
        return;
    };
    let mut live: Vec<usize> = Vec::new();

    for chunk in data[2..].chunks_exact(3) {
        let arg = usize::from(u16::from_le_bytes([chunk[1], chunk[2]]));
        match chunk[0] % 4 {
            0 => match space.malloc(arg) {
                Ok(Some(address)) => live.push(address),
                Ok(None) => assert!(space.largest_free().unwrap_or(0) < arg),
                Err(err) => assert_eq!((arg, err), (0, AllocatorError::ZeroLength)),
            },
            1 if !live.is_empty() => {
                let address = live.swap_remove(arg % live.len());
                assert_eq!(space.free(address), Ok(()));
            }
            1 | 2 => {
                // Arbitrary address: only the documented outcomes are allowed.
                let before = space.snapshot();
                match space.free(arg) {
                    Ok(()) => {}
                    Err(AllocatorError::EmptyAllocation) => assert!(live.is_empty()),
                    Err(AllocatorError::UnknownAddress(a)) => {
                        assert_eq!(a, arg);
                        assert_eq!(space.snapshot(), before);
                    }
                    Err(err) => panic!("unexpected free error: {err}"),
                }
                live.retain(|&a| a != arg);
            }
            _ => {
                space.defrag();
                let once = space.snapshot();
                space.defrag();
                assert_eq!(space.snapshot(), once);
            }
        }
        space.drain_lifecycle_logs();
        assert_eq!(space.check_partition(), Ok(()));
        assert_eq!(space.allocated_list().len(), live.len());
    }
});
