use crate::{BidirectionalCoroutine, Coroutine, Final, Resumed, RunState};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

fn fibonacci() -> BidirectionalCoroutine<u64, ()> {
    BidirectionalCoroutine::new(|yield_| {
        yield_.suspend();
        let (mut a, mut b) = (0, 1);
        loop {
            yield_.suspend_with(a);
            (a, b) = (b, a + b);
        }
    })
}

struct DropCounter(Rc<Cell<u32>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn fibonacci_test() {
    let mut fib = fibonacci();
    assert!(fib.is_alive());
    let values: Vec<u64> = (0..10).map(|_| *fib.call(())).collect();
    assert_eq!(values, [0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
}

#[test]
fn running_bit_count_test() {
    let mut count_bits = BidirectionalCoroutine::<usize, (bool,)>::new(|yield_| {
        let mut count = 0;
        let mut args = *yield_.suspend();
        loop {
            if args.0 {
                count += 1;
            }
            args = *yield_.suspend_with(count);
        }
    });

    let bits = [true, false, false, true, true, false, true];
    let counts: Vec<usize> = bits.iter().map(|&bit| *count_bits.call((bit,))).collect();
    assert_eq!(counts, [1, 1, 1, 2, 3, 3, 4]);
}

#[test]
fn noise_sink_test() {
    let effects = Rc::new(RefCell::new(Vec::new()));
    let mut sink = Coroutine::<(String, usize)>::new({
        let effects = effects.clone();
        move |yield_| loop {
            let (word, n) = yield_.suspend().clone();
            effects.borrow_mut().push(format!("{word}/{n}"));
        }
    });

    for j in 0..6 {
        sink.resume((String::from("Moo"), j));
        assert!(sink.is_alive());
        assert_eq!(effects.borrow().len(), j + 1);
    }
    assert_eq!(
        *effects.borrow(),
        ["Moo/0", "Moo/1", "Moo/2", "Moo/3", "Moo/4", "Moo/5"]
    );
}

#[test]
fn argument_round_trip_test() {
    let observed = Rc::new(RefCell::new(Vec::new()));
    let mut echo = Coroutine::<(u64, String)>::new({
        let observed = observed.clone();
        move |yield_| loop {
            let args = yield_.suspend().clone();
            observed.borrow_mut().push(args);
        }
    });

    let mut rng = rand::thread_rng();
    let sent: Vec<(u64, String)> = (0..rng.gen_range(1..64))
        .map(|_| {
            let word: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            (rng.gen::<u64>(), word)
        })
        .collect();
    for args in &sent {
        echo.resume(args.clone());
    }
    assert_eq!(*observed.borrow(), sent);
}

#[test]
fn state_transitions_test() {
    let mut once = Coroutine::<(u8,)>::new(|yield_| {
        let (n,) = *yield_.suspend();
        assert_eq!(n, 7);
    });
    assert!(once.is_alive());
    assert_eq!(once.state(), RunState::Suspended);

    once.resume((7,));
    assert!(!once.is_alive());
    assert_eq!(once.state(), RunState::Done);
}

#[test]
fn terminates_during_priming_test() {
    let ran = Rc::new(Cell::new(false));
    let coroutine = Coroutine::<()>::new({
        let ran = ran.clone();
        move |_| ran.set(true)
    });
    assert!(ran.get());
    assert!(!coroutine.is_alive());
    assert_eq!(coroutine.state(), RunState::Done);
}

#[test]
#[should_panic(expected = "already terminated")]
fn resume_terminated_test() {
    let mut coroutine = Coroutine::<()>::new(|yield_| {
        yield_.suspend();
    });
    coroutine.resume(());
    assert!(!coroutine.is_alive());
    coroutine.resume(());
}

#[test]
fn final_value_test() {
    let mut countdown = BidirectionalCoroutine::<u32, ()>::new_final(|yield_| {
        yield_.suspend();
        yield_.suspend_with(1);
        yield_.suspend_with(2);
        Final(3u32)
    });

    assert_eq!(countdown.resume(()), Resumed::Yielded(&1));
    assert_eq!(countdown.resume(()), Resumed::Yielded(&2));
    let last = countdown.resume(());
    assert!(last.is_terminal());
    assert_eq!(last, Resumed::Returned(&3));
    assert!(!countdown.is_alive());
    assert_eq!(countdown.latest(), Some(&3));
}

#[test]
fn final_value_converts_test() {
    let mut widened = BidirectionalCoroutine::<u64, ()>::new_final(|yield_| {
        yield_.suspend();
        yield_.suspend_with(u64::MAX);
        Final(7u32)
    });
    assert_eq!(widened.resume(()), Resumed::Yielded(&u64::MAX));
    assert_eq!(widened.resume(()), Resumed::Returned(&7));

    let mut greeting = BidirectionalCoroutine::<String, ()>::new_final(|yield_| {
        yield_.suspend();
        Final("hello")
    });
    assert_eq!(greeting.call(()), "hello");
    assert!(!greeting.is_alive());
}

#[test]
fn final_during_priming_test() {
    let eager = BidirectionalCoroutine::<u32, ()>::new_final(|_| Final(9u32));
    assert!(!eager.is_alive());
    assert_eq!(eager.state(), RunState::Done);
    assert_eq!(eager.latest(), Some(&9));
}

#[test]
fn never_returning_body_test() {
    let mut ones = BidirectionalCoroutine::<u8, ()>::new(|yield_| loop {
        yield_.suspend_with(1);
    });
    for _ in 0..3 {
        assert_eq!(ones.resume(()), Resumed::Yielded(&1));
    }
    assert!(ones.is_alive());
}

#[test]
fn silent_return_test() {
    let mut single = BidirectionalCoroutine::<u32, ()>::new(|yield_| {
        yield_.suspend();
        yield_.suspend_with(7);
    });

    assert_eq!(single.resume(()).value(), Some(&7));
    assert_eq!(single.resume(()), Resumed::Complete);
    assert!(!single.is_alive());
    assert_eq!(single.latest(), Some(&7));
    assert_eq!(single.take_latest(), Some(7));
    assert_eq!(single.latest(), None);
}

#[test]
fn bare_suspend_test() {
    let mut stutter = BidirectionalCoroutine::<u32, ()>::new(|yield_| {
        yield_.suspend();
        yield_.suspend_with(1);
        yield_.suspend();
        yield_.suspend_with(2);
    });

    assert_eq!(stutter.resume(()), Resumed::Yielded(&1));
    assert_eq!(stutter.resume(()), Resumed::Suspended);
    assert_eq!(stutter.call(()), &2);
    assert_eq!(stutter.call(()), &2);
    assert!(!stutter.is_alive());
}

#[test]
#[should_panic(expected = "has not yielded a value yet")]
fn call_before_first_value_test() {
    let mut idle = BidirectionalCoroutine::<u32, ()>::new(|yield_| loop {
        yield_.suspend();
    });
    idle.call(());
}

#[test]
fn handle_move_test() {
    let mut fib = fibonacci();
    assert_eq!(*fib.call(()), 0);

    let mut handles = vec![fib];
    assert_eq!(*handles[0].call(()), 1);

    let mut boxed = Box::new(handles.pop().unwrap());
    assert_eq!(*boxed.call(()), 1);

    let mut fib = *boxed;
    assert_eq!(*fib.call(()), 2);
    assert_eq!(*fib.call(()), 3);
}

#[test]
fn nested_coroutine_test() {
    let mut scaled = BidirectionalCoroutine::<u64, ()>::new(|yield_| {
        let mut fib = fibonacci();
        yield_.suspend();
        loop {
            let next = *fib.call(());
            yield_.suspend_with(next * 10);
        }
    });
    let values: Vec<u64> = (0..6).map(|_| *scaled.call(())).collect();
    assert_eq!(values, [0, 10, 10, 20, 30, 50]);
}

#[test]
fn drop_unwinds_suspended_body_test() {
    let drops = Rc::new(Cell::new(0));
    let resumes = Rc::new(Cell::new(0));
    let mut coroutine = Coroutine::<()>::new({
        let drops = drops.clone();
        let resumes = resumes.clone();
        move |yield_| {
            let _guard = DropCounter(drops);
            loop {
                yield_.suspend();
                resumes.set(resumes.get() + 1);
            }
        }
    });

    coroutine.resume(());
    coroutine.resume(());
    assert_eq!(resumes.get(), 2);
    assert_eq!(drops.get(), 0);

    drop(coroutine);
    assert_eq!(drops.get(), 1);
    assert_eq!(resumes.get(), 2);
}

#[test]
fn drop_terminated_does_not_resume_test() {
    let drops = Rc::new(Cell::new(0));
    let mut coroutine = Coroutine::<()>::new({
        let drops = drops.clone();
        move |yield_| {
            let _guard = DropCounter(drops);
            yield_.suspend();
        }
    });
    coroutine.resume(());
    assert_eq!(drops.get(), 1);
    drop(coroutine);
    assert_eq!(drops.get(), 1);
}

#[test]
fn drop_before_first_resume_test() {
    let drops = Rc::new(Cell::new(0));
    let coroutine = BidirectionalCoroutine::<String, (String,)>::new({
        let drops = drops.clone();
        move |yield_| {
            let _guard = DropCounter(drops);
            let mut args = yield_.suspend().clone();
            loop {
                args = yield_.suspend_with(args.0.to_uppercase()).clone();
            }
        }
    });
    drop(coroutine);
    assert_eq!(drops.get(), 1);
}

#[test]
fn suspend_while_unwinding_test() {
    let caught = Rc::new(Cell::new(false));
    let mut stubborn = Coroutine::<()>::new({
        let caught = caught.clone();
        move |yield_| {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| loop {
                yield_.suspend();
            }));
            caught.set(true);
            yield_.suspend();
            unreachable!("suspended after cancellation");
        }
    });
    stubborn.resume(());
    drop(stubborn);
    assert!(caught.get());
}

#[test]
fn body_panic_propagates_test() {
    let mut fragile = Coroutine::<(u32,)>::new(|yield_| loop {
        let (n,) = *yield_.suspend();
        if n == 3 {
            panic!("boom at {n}");
        }
    });
    fragile.resume((1,));
    fragile.resume((2,));

    let err = panic::catch_unwind(AssertUnwindSafe(|| fragile.resume((3,)))).unwrap_err();
    assert_eq!(
        err.downcast_ref::<String>().map(String::as_str),
        Some("boom at 3")
    );
    assert!(!fragile.is_alive());
    assert_eq!(fragile.state(), RunState::Done);
}

#[test]
#[should_panic(expected = "broken setup")]
fn priming_panic_propagates_test() {
    let _ = Coroutine::<()>::new(|_| panic!("broken setup"));
}

#[test]
fn debug_format_test() {
    let mut fib = fibonacci();
    fib.call(());
    fib.call(());
    assert_eq!(
        format!("{fib:?}"),
        "BidirectionalCoroutine { state: Suspended, latest: Some(1) }"
    );
    let done = Coroutine::<()>::new(|_| {});
    assert_eq!(format!("{done:?}"), "Coroutine { state: Done, .. }");
}
