mod coroutine_tests;
