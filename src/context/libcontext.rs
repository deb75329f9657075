include!(concat!(env!("OUT_DIR"), "/libcontext.rs"));
