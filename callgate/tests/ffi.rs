use callgate::Status;
use callgate::ffi::{
    CallgateHandler, callgate_cancel, callgate_context_free, callgate_context_new,
    callgate_register, callgate_send, callgate_shutdown,
};
use std::ffi::{CStr, c_char, c_void};
use std::slice;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    arrived: Condvar,
}

unsafe extern "C" fn collect(user: *mut c_void, src: *const c_char, data: *const u8, len: usize) {
    unsafe {
        let inbox = &*(user as *const Inbox);
        let src = CStr::from_ptr(src).to_string_lossy().into_owned();
        let data = if len == 0 {
            Vec::new()
        } else {
            slice::from_raw_parts(data, len).to_vec()
        };
        inbox.messages.lock().unwrap().push((src, data));
        inbox.arrived.notify_all();
    }
}

#[test]
fn test_c_round_trip() {
    let ctx = callgate_context_new();
    assert!(!ctx.is_null());

    let inbox = Box::new(Inbox::default());
    let handler = CallgateHandler {
        cb: Some(collect),
        user: &*inbox as *const Inbox as *mut c_void,
    };
    let mut token = 0u64;

    unsafe {
        assert_eq!(callgate_register(ctx, c"D".as_ptr(), &handler, &mut token), 0);
        assert_eq!(
            callgate_send(ctx, c"D".as_ptr(), c"S".as_ptr(), [1u8, 2].as_ptr(), 2),
            0
        );
    }

    let messages = inbox.messages.lock().unwrap();
    let (messages, _) = inbox
        .arrived
        .wait_timeout_while(messages, Duration::from_secs(5), |m| m.is_empty())
        .unwrap();
    assert_eq!(*messages, vec![("S".to_string(), vec![1, 2])]);
    drop(messages);

    unsafe {
        assert_eq!(callgate_cancel(ctx, token), Status::Ok.code());
        assert_eq!(callgate_cancel(ctx, 0), Status::UnknownToken.code());
        assert_eq!(callgate_shutdown(ctx), 0);
        callgate_context_free(ctx);
    }
    // Safe to free once cancel returned.
    drop(inbox);
}
