// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest modules written in WebAssembly text for tests.
//!
//! The fake codec understands one "compressed" format: the ASCII tag `FAKE`, big-endian
//! width and height, then `width * height * 3` RGB bytes. Anything else fails with
//! "unsupported image signature". Every guest uses a bump allocator that counts live
//! allocations and poisons freed spans with `0xdd`, so leaks and use-after-free show up
//! in assertions.

use crate::runtime::buffer::{IMAGE_RECORD_SIZE, VEC_PARTS_RECORD_SIZE};
use crate::runtime::engine::create_engine;
use crate::runtime::instance::{GuestInstance, GuestModule, InstanceLimits};
use crate::runtime::memory::write_u32_le;
use std::sync::OnceLock;
use wasmtime::Engine;

const ALLOCATOR: &str = r#"
  (memory (export "memory") 2)
  (global $heap (mut i32) (i32.const 1024))
  (global $live (mut i32) (i32.const 0))

  (func $alloc (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local $end i32)
    (local $have i32)
    (local.set $ptr (i32.and (i32.add (global.get $heap) (i32.const 7)) (i32.const -8)))
    (local.set $end (i32.add (local.get $ptr) (local.get $len)))
    (local.set $have (i32.shl (memory.size) (i32.const 16)))
    (if (i32.gt_u (local.get $end) (local.get $have))
      (then
        (if (i32.eq
              (memory.grow
                (i32.shr_u
                  (i32.add (i32.sub (local.get $end) (local.get $have)) (i32.const 65535))
                  (i32.const 16)))
              (i32.const -1))
          (then (return (i32.const 0))))))
    (global.set $heap (local.get $end))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (local.get $ptr))

  (func $dealloc (export "dealloc") (param $ptr i32) (param $len i32)
    (memory.fill (local.get $ptr) (i32.const 0xdd) (local.get $len))
    (global.set $live (i32.sub (global.get $live) (i32.const 1))))

  (func (export "live_allocations") (result i32)
    (global.get $live))

  (func $load_be (param $addr i32) (result i32)
    (i32.or
      (i32.or
        (i32.shl (i32.load8_u (local.get $addr)) (i32.const 24))
        (i32.shl (i32.load8_u offset=1 (local.get $addr)) (i32.const 16)))
      (i32.or
        (i32.shl (i32.load8_u offset=2 (local.get $addr)) (i32.const 8))
        (i32.load8_u offset=3 (local.get $addr)))))

  (func $store_be (param $addr i32) (param $value i32)
    (i32.store8 (local.get $addr) (i32.shr_u (local.get $value) (i32.const 24)))
    (i32.store8 offset=1 (local.get $addr) (i32.shr_u (local.get $value) (i32.const 16)))
    (i32.store8 offset=2 (local.get $addr) (i32.shr_u (local.get $value) (i32.const 8)))
    (i32.store8 offset=3 (local.get $addr) (local.get $value)))
"#;

/// Image-record operations shared by the Context and ImageRecord surfaces.
/// `$slot` is the address of the last-error word: the context itself, or 256.
const IMAGE_OPS: &str = r#"
  (data (i32.const 512) "unsupported image signature\00")
  (data (i32.const 544) "invalid target dimensions\00")

  (func $set_error (param $slot i32) (param $msg i32)
    (local $copy i32)
    (if (i32.load (local.get $slot))
      (then (call $dealloc (i32.load (local.get $slot)) (i32.const 32))))
    (local.set $copy (call $alloc (i32.const 32)))
    (memory.copy (local.get $copy) (local.get $msg) (i32.const 32))
    (i32.store (local.get $slot) (local.get $copy)))

  (func $take_error (param $slot i32) (result i32)
    (local $msg i32)
    (local.set $msg (i32.load (local.get $slot)))
    (i32.store (local.get $slot) (i32.const 0))
    (local.get $msg))

  (func $new_image (param $ptr i32) (param $len i32) (param $w i32) (param $h i32) (param $fmt i32) (result i32)
    (local $img i32)
    (local.set $img (call $alloc (i32.const 24)))
    (i32.store (local.get $img) (local.get $ptr))
    (i32.store offset=4 (local.get $img) (local.get $len))
    (i32.store offset=8 (local.get $img) (local.get $len))
    (i32.store8 offset=12 (local.get $img) (local.get $fmt))
    (i32.store offset=16 (local.get $img) (local.get $w))
    (i32.store offset=20 (local.get $img) (local.get $h))
    (local.get $img))

  (func $image_free (param $img i32)
    (call $dealloc (i32.load (local.get $img)) (i32.load offset=8 (local.get $img)))
    (call $dealloc (local.get $img) (i32.const 24)))

  (func $decode (param $slot i32) (param $ptr i32) (param $len i32) (result i32)
    (local $w i32)
    (local $h i32)
    (local $size i32)
    (local $out i32)
    (if (i32.lt_u (local.get $len) (i32.const 12))
      (then
        (call $set_error (local.get $slot) (i32.const 512))
        (return (i32.const 0))))
    (if (i32.ne (i32.load (local.get $ptr)) (i32.const 0x454b4146))
      (then
        (call $set_error (local.get $slot) (i32.const 512))
        (return (i32.const 0))))
    (local.set $w (call $load_be (i32.add (local.get $ptr) (i32.const 4))))
    (local.set $h (call $load_be (i32.add (local.get $ptr) (i32.const 8))))
    (local.set $size (i32.mul (i32.mul (local.get $w) (local.get $h)) (i32.const 3)))
    (if (i32.or
          (i32.eqz (local.get $size))
          (i32.lt_u (i32.sub (local.get $len) (i32.const 12)) (local.get $size)))
      (then
        (call $set_error (local.get $slot) (i32.const 512))
        (return (i32.const 0))))
    (local.set $out (call $alloc (local.get $size)))
    (memory.copy (local.get $out) (i32.add (local.get $ptr) (i32.const 12)) (local.get $size))
    (call $new_image (local.get $out) (local.get $size) (local.get $w) (local.get $h) (i32.const 0)))

  (func $scale (param $value i32) (param $num i32) (param $den i32) (result i32)
    (local $scaled i32)
    (local.set $scaled
      (i32.wrap_i64
        (i64.div_u
          (i64.add
            (i64.mul
              (i64.mul (i64.extend_i32_u (local.get $value)) (i64.extend_i32_u (local.get $num)))
              (i64.const 2))
            (i64.extend_i32_u (local.get $den)))
          (i64.mul (i64.extend_i32_u (local.get $den)) (i64.const 2)))))
    (select (local.get $scaled) (i32.const 1) (local.get $scaled)))

  (func $resize (param $slot i32) (param $img i32) (param $tw i32) (param $th i32) (param $aspect i32) (result i32)
    (local $sw i32)
    (local $sh i32)
    (local $nw i32)
    (local $nh i32)
    (local $size i32)
    (local $out i32)
    (if (i32.or (i32.eqz (local.get $tw)) (i32.eqz (local.get $th)))
      (then
        (call $set_error (local.get $slot) (i32.const 544))
        (return (i32.const 0))))
    (local.set $nw (local.get $tw))
    (local.set $nh (local.get $th))
    (if (local.get $aspect)
      (then
        (local.set $sw (i32.load offset=16 (local.get $img)))
        (local.set $sh (i32.load offset=20 (local.get $img)))
        (if (i64.le_u
              (i64.mul (i64.extend_i32_u (local.get $sw)) (i64.extend_i32_u (local.get $th)))
              (i64.mul (i64.extend_i32_u (local.get $sh)) (i64.extend_i32_u (local.get $tw))))
          (then (local.set $nw (call $scale (local.get $sw) (local.get $th) (local.get $sh))))
          (else (local.set $nh (call $scale (local.get $sh) (local.get $tw) (local.get $sw)))))))
    (local.set $size (i32.mul (i32.mul (local.get $nw) (local.get $nh)) (i32.const 3)))
    (local.set $out (call $alloc (local.get $size)))
    (memory.fill (local.get $out) (i32.const 0x80) (local.get $size))
    (call $new_image (local.get $out) (local.get $size) (local.get $nw) (local.get $nh) (i32.const 0)))

  (func $encode (param $img i32) (param $fmt i32) (result i32)
    (local $len i32)
    (local $out i32)
    (local.set $len (i32.load offset=4 (local.get $img)))
    (local.set $out (call $alloc (i32.add (local.get $len) (i32.const 12))))
    (i32.store (local.get $out) (i32.const 0x454b4146))
    (call $store_be (i32.add (local.get $out) (i32.const 4)) (i32.load offset=16 (local.get $img)))
    (call $store_be (i32.add (local.get $out) (i32.const 8)) (i32.load offset=20 (local.get $img)))
    (memory.copy (i32.add (local.get $out) (i32.const 12)) (i32.load (local.get $img)) (local.get $len))
    (call $new_image
      (local.get $out)
      (i32.add (local.get $len) (i32.const 12))
      (i32.load offset=16 (local.get $img))
      (i32.load offset=20 (local.get $img))
      (local.get $fmt)))

  (func $hash (param $img i32) (param $out i32) (result i32)
    (local $p i32)
    (local $end i32)
    (local $h i64)
    (local.set $h (i64.const 0xcbf29ce484222325))
    (local.set $p (i32.load (local.get $img)))
    (local.set $end (i32.add (local.get $p) (i32.load offset=4 (local.get $img))))
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $p) (local.get $end)))
        (local.set $h
          (i64.mul
            (i64.xor (local.get $h) (i64.load8_u (local.get $p)))
            (i64.const 0x100000001b3)))
        (local.set $p (i32.add (local.get $p) (i32.const 1)))
        (br $next)))
    (i64.store (local.get $out) (local.get $h))
    (i32.const 0))
"#;

const CONTEXT_SURFACE: &str = r#"
  (func (export "context_new") (result i32)
    (local $ctx i32)
    (local.set $ctx (call $alloc (i32.const 8)))
    (i32.store (local.get $ctx) (i32.const 0))
    (local.get $ctx))
  (func (export "context_drop") (param $ctx i32)
    (if (i32.load (local.get $ctx))
      (then (call $dealloc (i32.load (local.get $ctx)) (i32.const 32))))
    (call $dealloc (local.get $ctx) (i32.const 8)))
  (func (export "jpeg_decode") (param $ctx i32) (param $ptr i32) (param $len i32) (result i32)
    (call $decode (local.get $ctx) (local.get $ptr) (local.get $len)))
  (func (export "png_decode") (param $ctx i32) (param $ptr i32) (param $len i32) (result i32)
    (call $decode (local.get $ctx) (local.get $ptr) (local.get $len)))
  (func (export "resize") (param $ctx i32) (param $img i32) (param $w i32) (param $h i32) (param $aspect i32) (result i32)
    (call $resize (local.get $ctx) (local.get $img) (local.get $w) (local.get $h) (local.get $aspect)))
  (func (export "jpeg_encode") (param $ctx i32) (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 1)))
  (func (export "png_encode") (param $ctx i32) (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 2)))
  (func (export "avif_encode") (param $ctx i32) (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 3)))
  (func (export "webp_encode") (param $ctx i32) (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 4)))
  (func (export "hash") (param $ctx i32) (param $img i32) (param $out i32) (result i32)
    (call $hash (local.get $img) (local.get $out)))
  (func (export "last_error_message") (param $ctx i32) (result i32)
    (call $take_error (local.get $ctx)))
  (func (export "error_message_drop") (param $msg i32)
    (call $dealloc (local.get $msg) (i32.const 32)))
  (func (export "image_drop") (param $img i32)
    (call $image_free (local.get $img)))
"#;

const IMAGE_RECORD_SURFACE: &str = r#"
  (func (export "jpeg_decode") (param $ptr i32) (param $len i32) (result i32)
    (call $decode (i32.const 256) (local.get $ptr) (local.get $len)))
  (func (export "png_decode") (param $ptr i32) (param $len i32) (result i32)
    (call $decode (i32.const 256) (local.get $ptr) (local.get $len)))
  (func (export "resize") (param $img i32) (param $w i32) (param $h i32) (result i32)
    (call $resize (i32.const 256) (local.get $img) (local.get $w) (local.get $h) (i32.const 0)))
  (func (export "jpeg_encode") (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 1)))
  (func (export "png_encode") (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 2)))
  (func (export "avif_encode") (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 3)))
  (func (export "webp_encode") (param $img i32) (result i32)
    (call $encode (local.get $img) (i32.const 4)))
  (func (export "hash") (param $img i32) (param $out i32) (result i32)
    (call $hash (local.get $img) (local.get $out)))
  (func (export "last_error_message") (result i32)
    (call $take_error (i32.const 256)))
  (func (export "error_message_destroy") (param $msg i32)
    (call $dealloc (local.get $msg) (i32.const 32)))
  (func (export "image_destroy") (param $img i32)
    (call $image_free (local.get $img)))
"#;

const VEC_PARTS_OPS: &str = r#"
  (func $new_vec (param $ptr i32) (param $len i32) (result i32)
    (local $rec i32)
    (local.set $rec (call $alloc (i32.const 12)))
    (i32.store (local.get $rec) (local.get $ptr))
    (i32.store offset=4 (local.get $rec) (local.get $len))
    (i32.store offset=8 (local.get $rec) (local.get $len))
    (local.get $rec))

  (func (export "dealloc_vec") (param $rec i32)
    (call $dealloc (i32.load (local.get $rec)) (i32.load offset=8 (local.get $rec)))
    (call $dealloc (local.get $rec) (i32.const 12)))

  (func $decode (param $ptr i32) (param $len i32) (result i32)
    (local $size i32)
    (local $out i32)
    (if (i32.lt_u (local.get $len) (i32.const 12))
      (then (return (i32.const 0))))
    (if (i32.ne (i32.load (local.get $ptr)) (i32.const 0x454b4146))
      (then (return (i32.const 0))))
    (local.set $size
      (i32.mul
        (i32.mul
          (call $load_be (i32.add (local.get $ptr) (i32.const 4)))
          (call $load_be (i32.add (local.get $ptr) (i32.const 8))))
        (i32.const 3)))
    (if (i32.or
          (i32.eqz (local.get $size))
          (i32.lt_u (i32.sub (local.get $len) (i32.const 12)) (local.get $size)))
      (then (return (i32.const 0))))
    (local.set $out (call $alloc (i32.add (local.get $size) (i32.const 8))))
    (memory.copy
      (local.get $out)
      (i32.add (local.get $ptr) (i32.const 4))
      (i32.add (local.get $size) (i32.const 8)))
    (call $new_vec (local.get $out) (i32.add (local.get $size) (i32.const 8))))

  (func (export "decode_jpeg") (param i32 i32) (result i32)
    (call $decode (local.get 0) (local.get 1)))
  (func (export "decode_png") (param i32 i32) (result i32)
    (call $decode (local.get 0) (local.get 1)))

  (func (export "resize") (param $ptr i32) (param $len i32) (param $w1 i32) (param $h1 i32) (param $w2 i32) (param $h2 i32) (result i32)
    (local $size i32)
    (local $out i32)
    (if (i32.ne (local.get $len) (i32.mul (i32.mul (local.get $w1) (local.get $h1)) (i32.const 3)))
      (then (return (i32.const 0))))
    (local.set $size (i32.mul (i32.mul (local.get $w2) (local.get $h2)) (i32.const 3)))
    (if (i32.eqz (local.get $size))
      (then (return (i32.const 0))))
    (local.set $out (call $alloc (local.get $size)))
    (memory.fill (local.get $out) (i32.const 0x80) (local.get $size))
    (call $new_vec (local.get $out) (local.get $size)))

  (func $encode (param $ptr i32) (param $len i32) (param $w i32) (param $h i32) (result i32)
    (local $out i32)
    (if (i32.ne (local.get $len) (i32.mul (i32.mul (local.get $w) (local.get $h)) (i32.const 3)))
      (then (return (i32.const 0))))
    (local.set $out (call $alloc (i32.add (local.get $len) (i32.const 12))))
    (i32.store (local.get $out) (i32.const 0x454b4146))
    (call $store_be (i32.add (local.get $out) (i32.const 4)) (local.get $w))
    (call $store_be (i32.add (local.get $out) (i32.const 8)) (local.get $h))
    (memory.copy (i32.add (local.get $out) (i32.const 12)) (local.get $ptr) (local.get $len))
    (call $new_vec (local.get $out) (i32.add (local.get $len) (i32.const 12))))

  (func (export "encode_jpeg") (param i32 i32 i32 i32) (result i32)
    (call $encode (local.get 0) (local.get 1) (local.get 2) (local.get 3)))
  (func (export "encode") (param i32 i32 i32 i32) (result i32)
    (call $encode (local.get 0) (local.get 1) (local.get 2) (local.get 3)))
"#;

/// Exercises every shim import from exported functions.
pub(crate) const SHIM_EXERCISE_WAT: &str = r#"(module
  (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "random_get" (func $random_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (import "wasi_snapshot_preview1" "fd_close" (func $fd_close (param i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_seek" (func $fd_seek (param i32 i64 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "environ_sizes_get" (func $environ_sizes_get (param i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "\40\00\00\00\05\00\00\00")
  (data (i32.const 64) "hello")
  (func (export "alloc") (param i32) (result i32) (i32.const 1024))
  (func (export "dealloc") (param i32 i32))
  (func (export "dealloc_vec") (param i32))
  (func (export "say_hello") (param $fd i32) (result i32)
    (call $fd_write (local.get $fd) (i32.const 0) (i32.const 1) (i32.const 16)))
  (func (export "fill_random") (param i32 i32) (result i32)
    (call $random_get (local.get 0) (local.get 1)))
  (func (export "exit") (param i32)
    (call $proc_exit (local.get 0)))
  (func (export "close_stdout") (result i32)
    (call $fd_close (i32.const 1)))
  (func (export "seek_stdout") (result i32)
    (call $fd_seek (i32.const 1) (i64.const 0) (i32.const 0) (i32.const 48)))
  (func (export "environ_sizes") (result i32)
    (i32.store (i32.const 32) (i32.const -1))
    (i32.store (i32.const 36) (i32.const -1))
    (call $environ_sizes_get (i32.const 32) (i32.const 36)))
  (func (export "spin")
    (loop $forever (br $forever))))"#;

/// Calls `random_get` from its start function, before memory can be bound.
pub(crate) const RANDOM_IN_START_WAT: &str = r#"(module
  (import "wasi_snapshot_preview1" "random_get" (func $random_get (param i32 i32) (result i32)))
  (memory (export "memory") 1)
  (func $seed (drop (call $random_get (i32.const 0) (i32.const 8))))
  (start $seed)
  (func (export "alloc") (param i32) (result i32) (i32.const 1024))
  (func (export "dealloc") (param i32 i32))
  (func (export "dealloc_vec") (param i32)))"#;

pub(crate) const NO_MEMORY_WAT: &str = r#"(module
  (func (export "alloc") (param i32) (result i32) (i32.const 1024))
  (func (export "dealloc") (param i32 i32))
  (func (export "dealloc_vec") (param i32)))"#;

/// Fake codec in the Context (`with_context`) or ImageRecord generation.
pub(crate) fn codec_guest_wat(with_context: bool) -> String {
    let surface = if with_context {
        CONTEXT_SURFACE
    } else {
        IMAGE_RECORD_SURFACE
    };
    format!("(module\n{}\n{}\n{}\n)", ALLOCATOR, IMAGE_OPS, surface)
}

/// ImageRecord codec whose error accessor exits the process instead of returning.
pub(crate) fn exiting_error_accessor_wat() -> String {
    let surface = IMAGE_RECORD_SURFACE.replace(
        "(call $take_error (i32.const 256))",
        "(call $proc_exit (i32.const 7))\n    (unreachable)",
    );
    format!(
        "(module\n  (import \"wasi_snapshot_preview1\" \"proc_exit\" (func $proc_exit (param i32)))\n{}\n{}\n{}\n)",
        ALLOCATOR, IMAGE_OPS, surface
    )
}

/// Fake codec in the VecParts generation, all three operations in one binary.
pub(crate) fn vec_parts_guest_wat() -> String {
    format!("(module\n{}\n{}\n)", ALLOCATOR, VEC_PARTS_OPS)
}

fn engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(|| create_engine().unwrap())
}

pub(crate) fn shared_engine() -> Engine {
    engine().clone()
}

pub(crate) fn context_wasm() -> Vec<u8> {
    wat::parse_str(codec_guest_wat(true)).unwrap()
}

pub(crate) fn image_record_wasm() -> Vec<u8> {
    wat::parse_str(codec_guest_wat(false)).unwrap()
}

pub(crate) fn vec_parts_wasm() -> Vec<u8> {
    wat::parse_str(vec_parts_guest_wat()).unwrap()
}

fn module(name: &str, bytes: &[u8], limits: InstanceLimits) -> GuestModule {
    GuestModule::from_bytes(engine(), name, bytes, limits).unwrap()
}

pub(crate) fn context_module() -> GuestModule {
    module("context", &context_wasm(), InstanceLimits::default())
}

pub(crate) fn image_record_module() -> GuestModule {
    module("image-record", &image_record_wasm(), InstanceLimits::default())
}

pub(crate) fn vec_parts_module() -> GuestModule {
    module("vec-parts", &vec_parts_wasm(), InstanceLimits::default())
}

pub(crate) fn context_instance() -> GuestInstance {
    context_module().instantiate().unwrap()
}

pub(crate) fn context_instance_with_max_input(max_input_size: usize) -> GuestInstance {
    let limits = InstanceLimits {
        max_input_size,
        ..InstanceLimits::default()
    };
    module("context", &context_wasm(), limits)
        .instantiate()
        .unwrap()
}

pub(crate) fn image_record_instance() -> GuestInstance {
    image_record_module().instantiate().unwrap()
}

pub(crate) fn exiting_error_accessor_instance() -> GuestInstance {
    let bytes = wat::parse_str(exiting_error_accessor_wat()).unwrap();
    module("exiting-accessor", &bytes, InstanceLimits::default())
        .instantiate()
        .unwrap()
}

pub(crate) fn vec_parts_instance() -> GuestInstance {
    vec_parts_module().instantiate().unwrap()
}

pub(crate) fn all_generations() -> Vec<GuestInstance> {
    vec![
        context_instance(),
        image_record_instance(),
        vec_parts_instance(),
    ]
}

pub(crate) fn live_allocations(instance: &mut GuestInstance) -> i32 {
    instance.call("live_allocations", ()).unwrap()
}

/// Writes a 24-byte image record describing `[ptr, ptr + len)` and returns its address.
pub(crate) fn write_image_record(
    instance: &mut GuestInstance,
    ptr: u32,
    len: u32,
    width: u32,
    height: u32,
    format: u8,
) -> u32 {
    let record = instance.alloc(IMAGE_RECORD_SIZE).unwrap();
    let memory = instance.memory_mut();
    write_u32_le(memory, record, ptr).unwrap();
    write_u32_le(memory, record + 4, len).unwrap();
    write_u32_le(memory, record + 8, len).unwrap();
    memory[record as usize + 12] = format;
    write_u32_le(memory, record + 16, width).unwrap();
    write_u32_le(memory, record + 20, height).unwrap();
    record
}

/// Writes a `(ptr, len, cap)` record and returns its address.
pub(crate) fn write_vec_parts_record(instance: &mut GuestInstance, ptr: u32, len: u32) -> u32 {
    let record = instance.alloc(VEC_PARTS_RECORD_SIZE).unwrap();
    let memory = instance.memory_mut();
    write_u32_le(memory, record, ptr).unwrap();
    write_u32_le(memory, record + 4, len).unwrap();
    write_u32_le(memory, record + 8, len).unwrap();
    record
}

/// A "compressed" image the fake codecs can decode.
pub(crate) fn fake_image(width: u32, height: u32) -> Vec<u8> {
    let pixels = (width * height * 3) as usize;
    let mut bytes = Vec::with_capacity(12 + pixels);
    bytes.extend_from_slice(b"FAKE");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend((0..pixels).map(|i| (i % 251) as u8));
    bytes
}

/// The digest the fake `hash` export computes: FNV-1a 64, little-endian, hex.
pub(crate) fn fnv1a_hex(bytes: &[u8]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash.to_le_bytes()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
